//! Tag failures in the middle of a transaction

mod common;

use common::{NOW, VALIDITY, issued, machine, page_u16};
use nexum_tag_core::{Fault, TagError};
use nexum_ticket::{Error, Expiry, RecordKind, Step};

#[test]
fn test_issue_write_failures_name_the_step() {
    let cases = [
        (Fault::Write(44), Step::WriteKey),
        (Fault::Write(42), Step::ConfigureProtection),
        (Fault::Write(39), Step::WriteMaxRides),
        (Fault::Write(38), Step::WriteCounterInitState),
        (Fault::Write(37), Step::WriteMac(RecordKind::Unactivated)),
    ];

    for (fault, step) in cases {
        let (mut machine, _clock) = machine();
        machine.tag_mut().inject(fault);

        let err = machine.issue(5, VALIDITY).unwrap_err();
        assert!(err.is_tag_failure());
        assert_eq!(
            err,
            Error::TagWrite {
                step,
                source: TagError::Timeout
            },
            "{fault:?}"
        );
        assert!(machine.info_to_show().starts_with("Failed "));

        // Issuing again on the same card completes the ticket
        machine.tag_mut().reinsert();
        let receipt = machine.issue(5, VALIDITY).unwrap();
        assert_eq!(receipt.remaining, 5, "{fault:?}");
        assert_eq!(machine.use_ticket().unwrap().remaining, 4, "{fault:?}");
    }
}

#[test]
fn test_issue_read_failures_name_the_step() {
    let cases = [
        (Fault::Read(0), Step::ReadUid),
        (Fault::Read(41), Step::ReadCounter),
        (Fault::Read(38), Step::ReadRecord(RecordKind::Unactivated)),
    ];

    for (fault, step) in cases {
        let (mut machine, _clock) = machine();
        machine.tag_mut().inject(fault);
        assert_eq!(
            machine.issue(5, VALIDITY),
            Err(Error::TagRead {
                step,
                source: TagError::Timeout
            }),
            "{fault:?}"
        );
    }
}

#[test]
fn test_removed_card() {
    let (mut machine, _clock) = issued(5);
    machine.tag_mut().remove();

    let err = machine.use_ticket().unwrap_err();
    assert_eq!(
        err,
        Error::TagRead {
            step: Step::ReadUid,
            source: TagError::Removed
        }
    );
    assert_eq!(
        machine.info_to_show(),
        "Failed reading the UID: Tag removed from the field"
    );
}

#[test]
fn test_authentication_fault() {
    let (mut machine, _clock) = issued(5);
    machine.tag_mut().inject(Fault::Authenticate);
    assert_eq!(machine.use_ticket(), Err(Error::AuthenticationFailed));
    assert_eq!(machine.tag().counter(), 0);
}

#[test]
fn test_failed_expiry_write_leaves_ticket_unactivated() {
    let (mut machine, clock) = issued(5);
    machine.tag_mut().inject(Fault::Write(38));

    assert_eq!(
        machine.use_ticket(),
        Err(Error::TagWrite {
            step: Step::WriteExpiry,
            source: TagError::Timeout
        })
    );
    assert_eq!(machine.inspect().unwrap().kind, RecordKind::Unactivated);

    clock.advance(5);
    let ride = machine.use_ticket().unwrap();
    assert!(ride.activated);
    assert_eq!(ride.expiry, Expiry::from_minutes(NOW + 5 + VALIDITY));
}

#[test]
fn test_failed_activation_mac_needs_reissue() {
    let (mut machine, _clock) = issued(5);
    machine.tag_mut().inject(Fault::Write(36));

    assert_eq!(
        machine.use_ticket(),
        Err(Error::TagWrite {
            step: Step::WriteMac(RecordKind::Activated),
            source: TagError::Timeout
        })
    );
    assert_eq!(machine.tag().counter(), 0);

    // The expiry is on the card but its MAC is not
    assert_eq!(
        machine.use_ticket(),
        Err(Error::MacMismatch {
            kind: RecordKind::Activated
        })
    );

    let receipt = machine.issue(5, VALIDITY).unwrap();
    assert_eq!(receipt.carried_forward, 0);
    assert_eq!(machine.use_ticket().unwrap().remaining, 4);
}

#[test]
fn test_degraded_counter_increment() {
    let (mut machine, _clock) = issued(5);
    machine.tag_mut().inject(Fault::Write(41));

    let ride = machine.use_ticket().unwrap();
    assert_eq!(ride.remaining, 4);
    assert_eq!(ride.counter_error, Some(TagError::Timeout));
    assert!(!ride.is_recorded());
    assert!(
        machine
            .info_to_show()
            .ends_with("Failed to increment counter: Operation timed out")
    );

    // The ride was not recorded, so the card still holds five
    assert_eq!(machine.tag().counter(), 0);
    assert_eq!(page_u16(machine.tag(), 39), 5);
    let next = machine.use_ticket().unwrap();
    assert!(next.is_recorded());
    assert!(!next.activated);
    assert_eq!(next.remaining, 4);
    assert_eq!(machine.tag().counter(), 1);
}
