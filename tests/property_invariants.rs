use chrono::NaiveDate;
use proptest::prelude::*;

use costumelog::{
    borrow::{LoanRequest, ReturnReport},
    core::{
        availability::{available, borrowed_quantity},
        ledger::Ledger,
        loan::{LoanError, prepare_loan, prepare_return},
    },
    item::ItemDraft,
    types::BorrowStatus,
};

#[derive(Debug, Clone)]
enum Action {
    Borrow { item: u8, qty: u8 },
    Return { target: u8 },
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        (0u8..4, 0u8..8).prop_map(|(item, qty)| Action::Borrow { item, qty }),
        (0u8..64).prop_map(|target| Action::Return { target }),
    ]
}

fn seeded_ledger(stock: &[u32]) -> Ledger {
    let mut ledger = Ledger::new();
    for (idx, qty) in stock.iter().enumerate() {
        let mut draft = ItemDraft::quick(format!("Costume {idx}"), None);
        draft.quantity = *qty;
        ledger.prepend_item(draft.into_item(format!("c_{idx}"))).unwrap();
    }
    ledger
}

fn full_scan_borrowed(ledger: &Ledger, item_id: &str) -> u64 {
    ledger
        .records()
        .filter(|r| r.inventory_id == item_id && r.status == BorrowStatus::Borrowed)
        .map(|r| u64::from(r.qty))
        .sum()
}

proptest! {
    #[test]
    fn sequential_loans_never_overdraw_stock(
        stock in prop::collection::vec(0u32..10, 4),
        actions in prop::collection::vec(action_strategy(), 1..150),
    ) {
        let mut ledger = seeded_ledger(&stock);
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let mut next = 0u32;

        for action in actions {
            match action {
                Action::Borrow { item, qty } => {
                    let item_id = format!("c_{item}");
                    let before = ledger.record_len();
                    let request = LoanRequest { qty: u32::from(qty), ..LoanRequest::new(item_id, "Ana") };
                    next += 1;
                    match prepare_loan(&ledger, request, format!("b_{next}"), today) {
                        Ok(rec) => ledger.prepend_record(rec).unwrap(),
                        Err(LoanError::InsufficientAvailability { .. }) | Err(LoanError::InvalidQuantity) => {
                            prop_assert_eq!(ledger.record_len(), before);
                        }
                        Err(other) => prop_assert!(false, "unexpected loan error: {other:?}"),
                    }
                }
                Action::Return { target } => {
                    let ids: Vec<String> = ledger.records().map(|r| r.id.clone()).collect();
                    if ids.is_empty() {
                        continue;
                    }
                    let id = &ids[usize::from(target) % ids.len()];
                    let patch = prepare_return(&ledger, id, ReturnReport::default(), today).unwrap();
                    let mut rec = ledger.record(id).cloned().unwrap();
                    patch.apply_to(&mut rec);
                    ledger.replace_record(rec).unwrap();
                }
            }

            for item in ledger.items() {
                let borrowed = borrowed_quantity(&ledger, &item.id);
                prop_assert_eq!(borrowed, full_scan_borrowed(&ledger, &item.id));
                let free = available(&ledger, item);
                prop_assert_eq!(free, i64::from(item.quantity) - borrowed as i64);
                prop_assert!(free >= 0);
            }
        }
    }
}
