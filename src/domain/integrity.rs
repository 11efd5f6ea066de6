use std::collections::BTreeMap;

use serde::Serialize;

use super::{Event, EventId, Participant, ParticipantId, Slot, Trade};

/// Result of checking the board's cross-record invariants.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IntegrityReport {
    pub participant_count: usize,
    pub event_count: usize,
    pub vote_count: usize,
    pub trade_count: usize,
    /// Participants whose balance dropped below zero
    pub negative_balances: Vec<ParticipantId>,
    /// Events with a negative score
    pub negative_scores: Vec<EventId>,
    /// Slots bound to more than one event
    pub contested_slots: Vec<Slot>,
    /// Slotted events without a trade for their current slot and price
    pub unbacked_slots: Vec<EventId>,
}

impl IntegrityReport {
    pub fn is_healthy(&self) -> bool {
        self.negative_balances.is_empty()
            && self.negative_scores.is_empty()
            && self.contested_slots.is_empty()
            && self.unbacked_slots.is_empty()
    }
}

pub fn build_integrity_report(
    participants: &[Participant],
    events: &[Event],
    vote_count: usize,
    trades: &[Trade],
) -> IntegrityReport {
    let negative_balances = participants
        .iter()
        .filter(|p| p.balance < 0)
        .map(|p| p.id)
        .collect();

    let negative_scores = events
        .iter()
        .filter(|e| e.score < 0)
        .map(|e| e.id)
        .collect();

    let mut occupancy: BTreeMap<Slot, usize> = BTreeMap::new();
    for slot in events.iter().filter_map(|e| e.rank_slot) {
        *occupancy.entry(slot).or_insert(0) += 1;
    }
    let contested_slots = occupancy
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(slot, _)| slot)
        .collect();

    let unbacked_slots = events
        .iter()
        .filter(|e| {
            e.rank_slot.is_some_and(|slot| {
                !trades
                    .iter()
                    .any(|t| t.event == e.id && t.slot == slot && t.amount == e.purchase_price)
            })
        })
        .map(|e| e.id)
        .collect();

    IntegrityReport {
        participant_count: participants.len(),
        event_count: events.len(),
        vote_count,
        trade_count: trades.len(),
        negative_balances,
        negative_scores,
        contested_slots,
        unbacked_slots,
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn slotted(name: &str, slot: Slot, price: i64) -> Event {
        let mut event = Event::new(name, "Economy");
        event.rank_slot = Some(slot);
        event.purchase_price = price;
        event
    }

    #[test]
    fn test_empty_board_is_healthy() {
        let report = build_integrity_report(&[], &[], 0, &[]);
        assert!(report.is_healthy());
    }

    #[test]
    fn test_backed_slot_is_healthy() {
        let buyer = Uuid::new_v4();
        let event = slotted("FirstEvent", 1, 100);
        let trade = Trade::new(buyer, event.id, 100, 1);

        let report = build_integrity_report(&[], &[event], 0, &[trade]);
        assert!(report.is_healthy());
        assert_eq!(report.trade_count, 1);
    }

    #[test]
    fn test_detects_contested_slot() {
        let a = slotted("A", 2, 0);
        let b = slotted("B", 2, 0);
        let trades = vec![
            Trade::new(Uuid::new_v4(), a.id, 0, 2),
            Trade::new(Uuid::new_v4(), b.id, 0, 2),
        ];

        let report = build_integrity_report(&[], &[a, b], 0, &trades);
        assert_eq!(report.contested_slots, vec![2]);
        assert!(!report.is_healthy());
    }

    #[test]
    fn test_detects_price_without_matching_trade() {
        let event = slotted("FirstEvent", 1, 100);
        let stale = Trade::new(Uuid::new_v4(), event.id, 50, 1);

        let report = build_integrity_report(&[], &[event.clone()], 0, &[stale]);
        assert_eq!(report.unbacked_slots, vec![event.id]);
    }

    #[test]
    fn test_detects_negative_balance() {
        let mut p = Participant::new("Mike", 0);
        p.balance = -1;

        let report = build_integrity_report(&[p.clone()], &[], 0, &[]);
        assert_eq!(report.negative_balances, vec![p.id]);
    }
}
