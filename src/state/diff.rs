/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Structural comparison of two states, used to explain why two executors disagreed.
//!
//! Every line has the form `path: left != right`, e.g.
//! `accounts.0x…01.balance: 1000 != 999`.

use std::collections::BTreeSet;

use super::{Account, StateDB};

/// Lists the differences between two states. Returns an empty list if their contents are equal.
pub fn diff(left: &StateDB, right: &StateDB) -> Vec<String> {
    let mut lines = Vec::new();

    let (left_accounts, right_accounts) = (left.dump(), right.dump());
    let addresses: BTreeSet<_> = left_accounts.keys().chain(right_accounts.keys()).collect();
    for address in addresses {
        let path = format!("accounts.{address}");
        match (left_accounts.get(address), right_accounts.get(address)) {
            (Some(l), Some(r)) => diff_account(&path, l, r, &mut lines),
            (Some(_), None) => lines.push(format!("{path}: present != <missing>")),
            (None, Some(_)) => lines.push(format!("{path}: <missing> != present")),
            (None, None) => {}
        }
    }

    if left.refund != right.refund {
        lines.push(format!("refund: {} != {}", left.refund, right.refund));
    }

    if left.logs.len() != right.logs.len() {
        lines.push(format!(
            "logs.len: {} != {}",
            left.logs.len(),
            right.logs.len()
        ));
    }
    for (i, (l, r)) in left.logs.iter().zip(right.logs.iter()).enumerate() {
        if l != r {
            lines.push(format!("logs.{i}: {l:?} != {r:?}"));
        }
    }

    lines
}

fn diff_account(path: &str, left: &Account, right: &Account, lines: &mut Vec<String>) {
    if left.nonce != right.nonce {
        lines.push(format!("{path}.nonce: {} != {}", left.nonce, right.nonce));
    }
    if left.balance != right.balance {
        lines.push(format!("{path}.balance: {} != {}", left.balance, right.balance));
    }
    if left.code != right.code {
        lines.push(format!("{path}.code: {:?} != {:?}", left.code, right.code));
    }
    let keys: BTreeSet<_> = left.storage.keys().chain(right.storage.keys()).collect();
    for key in keys {
        let (l, r) = (left.storage.get(key), right.storage.get(key));
        if l != r {
            lines.push(format!(
                "{path}.storage.{key}: {} != {}",
                l.copied().unwrap_or_default(),
                r.copied().unwrap_or_default()
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{Address, B256, U256};

    use super::*;

    #[test]
    fn test_equal_states_have_no_diff() {
        let state = StateDB::new().with_account(Address::ZERO, Account::default());
        assert!(diff(&state, &state.copy()).is_empty());
    }

    #[test]
    fn test_diff_lists_each_field() {
        let address = Address::repeat_byte(1);
        let base = StateDB::new().with_account(address, Account::with_balance(U256::from(10)));

        let mut left = base.copy();
        let mut right = base.copy();
        left.set_nonce(address, 1);
        right.add_balance(address, U256::from(1));
        right.set_storage(address, B256::repeat_byte(2), B256::repeat_byte(3));
        right.touch(Address::repeat_byte(4));

        let lines = diff(&left, &right);
        assert_eq!(lines.len(), 4, "{lines:#?}");
        assert!(lines[0].ends_with(".nonce: 1 != 0"));
        assert!(lines[1].ends_with(".balance: 10 != 11"));
        assert!(lines[2].contains(".storage."));
        assert!(lines[3].ends_with(": <missing> != present"));
    }
}
