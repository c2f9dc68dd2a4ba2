//! Shared fixtures for the ticket scenario tests
#![allow(dead_code)]

use nexum_tag_core::UltralightC;
use nexum_ticket::{HmacSha256, ManualClock, TicketConfig, TicketMachine};

/// 2026-10-18 00:00 UTC
pub(crate) const NOW: u32 = 29_871_360;

/// Validity window of the test machines, in minutes
pub(crate) const VALIDITY: u32 = 60;

pub(crate) const SERIAL: [u8; 7] = [0x04, 0x5A, 0x21, 0x7E, 0x91, 0x03, 0xC4];

pub(crate) type Machine = TicketMachine<UltralightC, HmacSha256, ManualClock>;

/// Machine holding a factory-fresh card, with a handle on its clock
pub(crate) fn machine() -> (Machine, ManualClock) {
    machine_with(UltralightC::blank(SERIAL))
}

pub(crate) fn machine_with(tag: UltralightC) -> (Machine, ManualClock) {
    let clock = ManualClock::new(NOW);
    (machine_on(tag, clock.clone()), clock)
}

/// Machine sharing `clock` with others, as two gates on one network would
pub(crate) fn machine_on(tag: UltralightC, clock: ManualClock) -> Machine {
    TicketMachine::with_parts(tag, HmacSha256, clock, &config()).unwrap()
}

pub(crate) fn config() -> TicketConfig {
    TicketConfig {
        validity_period: VALIDITY,
        ..TicketConfig::default()
    }
}

/// Machine holding a card that was issued `rides` rides
pub(crate) fn issued(rides: u16) -> (Machine, ManualClock) {
    let (mut machine, clock) = machine();
    machine.issue(rides, VALIDITY).unwrap();
    (machine, clock)
}

pub(crate) fn page_u16(tag: &UltralightC, page: u8) -> u16 {
    let data = tag.page(page);
    u16::from_le_bytes([data[0], data[1]])
}
