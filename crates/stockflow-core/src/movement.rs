//! # Movements
//!
//! A shipment line does not touch stock directly. It is first planned into
//! one or two signed [`Movement`]s, each aimed at a single
//! `(product, warehouse)` balance.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Route                     line {P, 4}          movements              │
//! │  ─────────────────────     ─────────────        ─────────────────────  │
//! │  Incoming  { W }        ──►                 ──► (P, W,  +4)            │
//! │  WriteOff  { W }        ──►                 ──► (P, W,  -4)            │
//! │  Transfer  { W1, W2 }   ──►                 ──► (P, W1, -4)            │
//! │                                                 (P, W2, +4)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Transfer decreases come first, so a line that cannot leave the source
//! never reaches the destination.
//!
//! The same table is what ledger reconciliation sums over committed
//! shipments.

use serde::{Deserialize, Serialize};

use crate::types::{Id, ItemRequest, ShipmentKind};

/// Signed change of one balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub product_id: Id,
    pub warehouse_id: Id,
    /// Positive adds stock, negative removes it. Never zero.
    pub delta: i64,
}

impl Movement {
    pub const fn inbound(product_id: Id, warehouse_id: Id, amount: i64) -> Self {
        Movement {
            product_id,
            warehouse_id,
            delta: amount,
        }
    }

    pub const fn outbound(product_id: Id, warehouse_id: Id, amount: i64) -> Self {
        Movement {
            product_id,
            warehouse_id,
            delta: -amount,
        }
    }

    #[inline]
    pub const fn is_decrease(&self) -> bool {
        self.delta < 0
    }

    /// Absolute number of units moved.
    #[inline]
    pub const fn amount(&self) -> i64 {
        self.delta.abs()
    }
}

/// Where the goods of a shipment go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Route {
    Incoming { warehouse: Id },
    WriteOff { warehouse: Id },
    Transfer { from: Id, to: Id },
}

impl Route {
    pub const fn kind(&self) -> ShipmentKind {
        match self {
            Route::Incoming { .. } => ShipmentKind::Incoming,
            Route::WriteOff { .. } => ShipmentKind::WriteOff,
            Route::Transfer { .. } => ShipmentKind::Transfer,
        }
    }

    /// Warehouse recorded on the shipment header.
    pub const fn primary_warehouse(&self) -> Id {
        match *self {
            Route::Incoming { warehouse } | Route::WriteOff { warehouse } => warehouse,
            Route::Transfer { from, .. } => from,
        }
    }

    /// Receiving warehouse of a transfer.
    pub const fn destination_warehouse(&self) -> Option<Id> {
        match *self {
            Route::Transfer { to, .. } => Some(to),
            _ => None,
        }
    }

    /// Every warehouse the route touches, primary first.
    pub fn warehouses(&self) -> Vec<Id> {
        match *self {
            Route::Incoming { warehouse } | Route::WriteOff { warehouse } => vec![warehouse],
            Route::Transfer { from, to } => vec![from, to],
        }
    }

    /// Plans the balance changes for one line, in application order.
    pub fn movements(&self, line: &ItemRequest) -> Vec<Movement> {
        match *self {
            Route::Incoming { warehouse } => {
                vec![Movement::inbound(line.product_id, warehouse, line.count)]
            }
            Route::WriteOff { warehouse } => {
                vec![Movement::outbound(line.product_id, warehouse, line.count)]
            }
            Route::Transfer { from, to } => vec![
                Movement::outbound(line.product_id, from, line.count),
                Movement::inbound(line.product_id, to, line.count),
            ],
        }
    }

    /// Plans a whole shipment, preserving caller order.
    pub fn plan(&self, lines: &[ItemRequest]) -> Vec<Movement> {
        lines.iter().flat_map(|line| self.movements(line)).collect()
    }
}

/// Net delta a movement list applies to one pair.
pub fn net_delta(movements: &[Movement], product_id: Id, warehouse_id: Id) -> i64 {
    movements
        .iter()
        .filter(|m| m.product_id == product_id && m.warehouse_id == warehouse_id)
        .map(|m| m.delta)
        .sum()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incoming_adds_to_target() {
        let route = Route::Incoming { warehouse: 1 };
        let moves = route.movements(&ItemRequest::new(9, 10));
        assert_eq!(moves, vec![Movement::inbound(9, 1, 10)]);
        assert_eq!(route.destination_warehouse(), None);
    }

    #[test]
    fn test_write_off_removes_from_source() {
        let route = Route::WriteOff { warehouse: 2 };
        let moves = route.movements(&ItemRequest::new(9, 3));
        assert_eq!(moves.len(), 1);
        assert!(moves[0].is_decrease());
        assert_eq!(moves[0].amount(), 3);
    }

    #[test]
    fn test_transfer_decreases_before_increasing() {
        let route = Route::Transfer { from: 1, to: 2 };
        let moves = route.movements(&ItemRequest::new(5, 4));
        assert_eq!(
            moves,
            vec![Movement::outbound(5, 1, 4), Movement::inbound(5, 2, 4)]
        );
        assert_eq!(route.primary_warehouse(), 1);
        assert_eq!(route.destination_warehouse(), Some(2));
        assert_eq!(route.warehouses(), vec![1, 2]);
    }

    #[test]
    fn test_plan_keeps_caller_order() {
        let route = Route::WriteOff { warehouse: 1 };
        let plan = route.plan(&[ItemRequest::new(3, 1), ItemRequest::new(1, 2)]);
        assert_eq!(plan[0].product_id, 3);
        assert_eq!(plan[1].product_id, 1);
    }

    #[test]
    fn test_net_delta_per_pair() {
        let route = Route::Transfer { from: 1, to: 2 };
        let plan = route.plan(&[ItemRequest::new(5, 4), ItemRequest::new(5, 6)]);
        assert_eq!(net_delta(&plan, 5, 1), -10);
        assert_eq!(net_delta(&plan, 5, 2), 10);
        assert_eq!(net_delta(&plan, 6, 1), 0);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn lines() -> impl Strategy<Value = Vec<ItemRequest>> {
            prop::collection::vec(
                (1i64..20, 1i64..10_000).prop_map(|(p, c)| ItemRequest::new(p, c)),
                1..20,
            )
        }

        proptest! {
            /// Property: a transfer never creates or destroys stock.
            #[test]
            fn transfer_conserves_units(from in 1i64..50, offset in 1i64..50, lines in lines()) {
                let route = Route::Transfer { from, to: from + offset };
                let plan = route.plan(&lines);
                prop_assert_eq!(plan.iter().map(|m| m.delta).sum::<i64>(), 0);
                prop_assert_eq!(plan.len(), lines.len() * 2);
            }

            /// Property: incoming and write-off move exactly the requested units.
            #[test]
            fn single_warehouse_routes_match_line_totals(w in 1i64..50, lines in lines()) {
                let total: i64 = lines.iter().map(|l| l.count).sum();

                let incoming = Route::Incoming { warehouse: w }.plan(&lines);
                prop_assert_eq!(incoming.iter().map(|m| m.delta).sum::<i64>(), total);

                let write_off = Route::WriteOff { warehouse: w }.plan(&lines);
                prop_assert_eq!(write_off.iter().map(|m| m.delta).sum::<i64>(), -total);
                prop_assert!(write_off.iter().all(|m| m.is_decrease() && m.warehouse_id == w));
            }

            /// Property: no planned movement is ever zero.
            #[test]
            fn movements_are_never_zero(w in 1i64..50, lines in lines()) {
                let plan = Route::Transfer { from: w, to: w + 1 }.plan(&lines);
                prop_assert!(plan.iter().all(|m| m.delta != 0));
            }
        }
    }
}
