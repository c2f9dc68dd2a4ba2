//! Validating rides

mod common;

use common::{NOW, VALIDITY, config, issued, machine, machine_on, page_u16};
use nexum_ticket::{Error, Expiry, HmacSha256, RecordKind, TicketConfig, TicketMachine};

#[test]
fn test_five_ride_ticket() {
    let (mut machine, _clock) = issued(5);
    assert_eq!(machine.remaining_uses(), 5);

    let first = machine.use_ticket().unwrap();
    assert!(first.activated);
    assert!(first.is_recorded());
    assert_eq!(first.remaining, 4);
    assert_eq!(first.expiry, Expiry::from_minutes(NOW + VALIDITY));
    assert_eq!(
        machine.info_to_show(),
        "Rides left: 4\nExpiry time: 2026-10-18 01:00 UTC"
    );

    for expected in [3, 2, 1, 0] {
        let ride = machine.use_ticket().unwrap();
        assert!(!ride.activated);
        assert_eq!(ride.remaining, expected);
        assert_eq!(ride.expiry, first.expiry);
    }
    assert_eq!(machine.tag().counter(), 5);

    assert_eq!(machine.use_ticket(), Err(Error::NoUsesRemaining));
    assert_eq!(machine.info_to_show(), "No rides left");
    assert_eq!(machine.tag().counter(), 5);
    assert_eq!(machine.remaining_uses(), 0);
}

#[test]
fn test_expired_ticket_is_refused() {
    let (mut machine, clock) = issued(3);
    assert_eq!(machine.use_ticket().unwrap().remaining, 2);

    // Still valid in the last minute of the window
    clock.advance(VALIDITY);
    assert_eq!(machine.use_ticket().unwrap().remaining, 1);
    assert_eq!(machine.tag().counter(), 2);

    clock.advance(1);
    assert_eq!(
        machine.use_ticket(),
        Err(Error::Expired {
            expiry: Expiry::from_minutes(NOW + VALIDITY)
        })
    );
    assert!(machine.info_to_show().starts_with("Expiry time exceeded"));
    assert_eq!(machine.tag().counter(), 2);
}

#[test]
fn test_validity_window_opens_on_first_use() {
    let (mut machine, clock) = issued(2);

    // Issued long before the first ride
    clock.advance(24 * 60);
    let ride = machine.use_ticket().unwrap();
    assert_eq!(ride.expiry, Expiry::from_minutes(NOW + 24 * 60 + VALIDITY));
}

#[test]
fn test_tampered_ride_ceiling_is_refused() {
    let (mut machine, _clock) = issued(5);
    machine.tag_mut().tamper(39, 0, 0x10);

    assert_eq!(
        machine.use_ticket(),
        Err(Error::MacMismatch {
            kind: RecordKind::Unactivated
        })
    );
    assert_eq!(machine.info_to_show(), "Invalid card data");
    assert_eq!(machine.tag().counter(), 0);
}

#[test]
fn test_tampered_expiry_is_refused() {
    let (mut machine, _clock) = issued(5);
    machine.use_ticket().unwrap();
    machine.tag_mut().tamper(38, 3, 0x01);

    assert_eq!(
        machine.use_ticket(),
        Err(Error::MacMismatch {
            kind: RecordKind::Activated
        })
    );
    assert_eq!(machine.tag().counter(), 1);
}

#[test]
fn test_tampered_mac_is_refused() {
    let (mut machine, _clock) = issued(5);
    machine.use_ticket().unwrap();
    machine.tag_mut().tamper(36, 0, 0x80);

    assert!(matches!(
        machine.use_ticket(),
        Err(Error::MacMismatch { .. })
    ));
    assert!(!machine.inspect().unwrap().mac_valid);
    assert_eq!(machine.tag().counter(), 1);
}

#[test]
fn test_activation_is_one_way() {
    let (mut machine, _clock) = issued(4);
    machine.use_ticket().unwrap();

    for _ in 0..3 {
        let snapshot = machine.inspect().unwrap();
        assert_eq!(snapshot.kind, RecordKind::Activated);
        assert_ne!(
            page_u16(machine.tag(), 38),
            page_u16(machine.tag(), 41)
        );
        machine.use_ticket().unwrap();
    }
    assert_eq!(machine.inspect().unwrap().kind, RecordKind::Activated);
}

#[test]
fn test_counter_strictly_increases() {
    let (mut machine, _clock) = issued(10);
    let mut previous = machine.tag().counter();

    for _ in 0..10 {
        machine.use_ticket().unwrap();
        let counter = machine.tag().counter();
        assert!(counter > previous);
        previous = counter;
    }
}

#[test]
fn test_reissue_restarts_the_validity_window() {
    let (mut machine, clock) = issued(5);
    machine.use_ticket().unwrap();

    clock.advance(30);
    let receipt = machine.issue(2, VALIDITY).unwrap();
    assert_eq!(receipt.remaining, 6);

    let ride = machine.use_ticket().unwrap();
    assert!(ride.activated);
    assert_eq!(ride.remaining, 5);
    assert_eq!(ride.expiry, Expiry::from_minutes(NOW + 30 + VALIDITY));
}

#[test]
fn test_window_comes_from_the_validating_machine() {
    let (mut issuer, clock) = machine();
    issuer.issue(5, VALIDITY).unwrap();

    // A gate configured with a longer window activates the ticket
    let gate_config = TicketConfig {
        validity_period: 24 * 60,
        ..config()
    };
    let mut gate =
        TicketMachine::with_parts(issuer.into_tag(), HmacSha256, clock, &gate_config)
            .unwrap();
    let ride = gate.use_ticket().unwrap();
    assert!(ride.activated);
    assert_eq!(ride.expiry, Expiry::from_minutes(NOW + 24 * 60));
}

#[test]
fn test_card_moves_between_machines() {
    let (mut issuer, clock) = machine();
    issuer.issue(3, VALIDITY).unwrap();

    let mut gate = machine_on(issuer.into_tag(), clock.clone());
    let ride = gate.use_ticket().unwrap();
    assert_eq!(ride.expiry, Expiry::from_minutes(NOW + VALIDITY));
    assert_eq!(ride.remaining, 2);

    clock.advance(10);
    let mut other_gate = machine_on(gate.into_tag(), clock);
    let ride = other_gate.use_ticket().unwrap();
    assert!(!ride.activated);
    assert_eq!(ride.expiry, Expiry::from_minutes(NOW + VALIDITY));
    assert_eq!(ride.remaining, 1);
}

#[test]
fn test_blank_card_cannot_be_used() {
    let (mut machine, _clock) = machine();
    assert_eq!(machine.use_ticket(), Err(Error::AuthenticationFailed));
    assert_eq!(machine.info_to_show(), "Authentication failed");
}

#[test]
fn test_status_before_any_operation() {
    let (machine, _clock) = machine();
    assert_eq!(machine.info_to_show(), "-");
}
