//! Sync operations.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single namespace-scoped storage action.
///
/// Operations are the shared vocabulary of the client and server engines:
/// a tracked client transaction records one per storage call, mutations
/// batch them, and server patches are expressed in them.
///
/// Write operations always carry enough information (`prev_data`) to be
/// mechanically reversed; see [`reverse_operations`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    /// Read of a single entity.
    Get {
        /// Namespace the entity lives in.
        namespace: String,
        /// Entity id.
        id: String,
    },
    /// Read of every value in a namespace.
    GetAll {
        /// Namespace read.
        namespace: String,
    },
    /// Read of every id in a namespace.
    GetAllKeys {
        /// Namespace read.
        namespace: String,
    },
    /// Create or replace an entity.
    Put {
        /// Namespace the entity lives in.
        namespace: String,
        /// Entity id.
        id: String,
        /// The stored value.
        data: Value,
    },
    /// Replace an entity, capturing the prior value.
    Update {
        /// Namespace the entity lives in.
        namespace: String,
        /// Entity id.
        id: String,
        /// The new value.
        data: Value,
        /// The value before the write, if the entity existed.
        prev_data: Option<Value>,
    },
    /// Remove an entity, capturing the prior value.
    Delete {
        /// Namespace the entity lives in.
        namespace: String,
        /// Entity id.
        id: String,
        /// The value before the delete, if the entity existed.
        prev_data: Option<Value>,
    },
}

impl Operation {
    /// Returns the namespace this operation touches.
    pub fn namespace(&self) -> &str {
        match self {
            Operation::Get { namespace, .. }
            | Operation::GetAll { namespace }
            | Operation::GetAllKeys { namespace }
            | Operation::Put { namespace, .. }
            | Operation::Update { namespace, .. }
            | Operation::Delete { namespace, .. } => namespace,
        }
    }

    /// Returns true for `Put`, `Update`, and `Delete`.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Operation::Put { .. } | Operation::Update { .. } | Operation::Delete { .. }
        )
    }

    /// Returns true for `Get`, `GetAll`, and `GetAllKeys`.
    pub fn is_read(&self) -> bool {
        !self.is_write()
    }
}

/// Computes the exact undo of an operation sequence.
///
/// Walks the operations in reverse order and reverses only writes:
/// `Put` becomes a `Delete` carrying the put's data as `prev_data`,
/// `Delete` becomes a `Put` restoring `prev_data`, and `Update` swaps
/// `data` with `prev_data`. Reads are dropped.
///
/// Law: applying a faithfully recorded sequence and then its reversal to
/// the same base state is a no-op.
pub fn reverse_operations(operations: &[Operation]) -> Vec<Operation> {
    let mut reversed = Vec::new();
    for operation in operations.iter().rev() {
        match operation {
            Operation::Put {
                namespace,
                id,
                data,
            } => reversed.push(Operation::Delete {
                namespace: namespace.clone(),
                id: id.clone(),
                prev_data: Some(data.clone()),
            }),
            Operation::Delete {
                namespace,
                id,
                prev_data,
            } => match prev_data {
                // Deleting a missing entity reverses to nothing.
                Some(prev) => reversed.push(Operation::Put {
                    namespace: namespace.clone(),
                    id: id.clone(),
                    data: prev.clone(),
                }),
                None => {}
            },
            Operation::Update {
                namespace,
                id,
                data,
                prev_data,
            } => match prev_data {
                Some(prev) => reversed.push(Operation::Update {
                    namespace: namespace.clone(),
                    id: id.clone(),
                    data: prev.clone(),
                    prev_data: Some(data.clone()),
                }),
                // The update created the entity; undo removes it.
                None => reversed.push(Operation::Delete {
                    namespace: namespace.clone(),
                    id: id.clone(),
                    prev_data: Some(data.clone()),
                }),
            },
            Operation::Get { .. } | Operation::GetAll { .. } | Operation::GetAllKeys { .. } => {}
        }
    }
    reversed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    /// Applies write operations to a plain map model of the store.
    fn apply(state: &mut BTreeMap<(String, String), Value>, operations: &[Operation]) {
        for op in operations {
            match op {
                Operation::Put {
                    namespace,
                    id,
                    data,
                }
                | Operation::Update {
                    namespace,
                    id,
                    data,
                    ..
                } => {
                    state.insert((namespace.clone(), id.clone()), data.clone());
                }
                Operation::Delete { namespace, id, .. } => {
                    state.remove(&(namespace.clone(), id.clone()));
                }
                _ => {}
            }
        }
    }

    fn put(id: &str, data: Value) -> Operation {
        Operation::Put {
            namespace: "nodes".into(),
            id: id.into(),
            data,
        }
    }

    #[test]
    fn classification() {
        assert!(put("1", json!(1)).is_write());
        assert!(Operation::Get {
            namespace: "nodes".into(),
            id: "1".into()
        }
        .is_read());
        assert_eq!(put("1", json!(1)).namespace(), "nodes");
    }

    #[test]
    fn reverse_drops_reads() {
        let ops = vec![
            Operation::GetAll {
                namespace: "nodes".into(),
            },
            put("1", json!(1)),
            Operation::Get {
                namespace: "nodes".into(),
                id: "1".into(),
            },
        ];

        let reversed = reverse_operations(&ops);
        assert_eq!(reversed.len(), 1);
        assert!(matches!(reversed[0], Operation::Delete { .. }));
    }

    #[test]
    fn reverse_put_then_delete_restores_state() {
        let mut state = BTreeMap::new();
        state.insert(("nodes".into(), "0".into()), json!("base"));
        let base = state.clone();

        let ops = vec![
            put("1", json!({ "text": "a" })),
            Operation::Delete {
                namespace: "nodes".into(),
                id: "0".into(),
                prev_data: Some(json!("base")),
            },
            Operation::Update {
                namespace: "nodes".into(),
                id: "1".into(),
                data: json!({ "text": "b" }),
                prev_data: Some(json!({ "text": "a" })),
            },
        ];

        apply(&mut state, &ops);
        assert_ne!(state, base);

        apply(&mut state, &reverse_operations(&ops));
        assert_eq!(state, base);
    }

    #[test]
    fn reverse_of_delete_without_prior_value_is_empty() {
        let ops = vec![Operation::Delete {
            namespace: "nodes".into(),
            id: "ghost".into(),
            prev_data: None,
        }];
        assert!(reverse_operations(&ops).is_empty());
    }

    #[test]
    fn reverse_of_creating_update_is_delete() {
        let ops = vec![Operation::Update {
            namespace: "nodes".into(),
            id: "1".into(),
            data: json!(1),
            prev_data: None,
        }];

        let reversed = reverse_operations(&ops);
        assert_eq!(reversed.len(), 1);
        assert!(matches!(reversed[0], Operation::Delete { .. }));
    }

    #[test]
    fn serde_roundtrip() {
        let op = Operation::Update {
            namespace: "relations".into(),
            id: "r1".into(),
            data: json!({ "sourceId": "a", "targetId": "b" }),
            prev_data: None,
        };

        let encoded = serde_json::to_string(&op).unwrap();
        let decoded: Operation = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, op);
    }

    mod reversal_law {
        use super::*;
        use proptest::prelude::*;

        fn value_strategy() -> impl Strategy<Value = Value> {
            prop_oneof![
                any::<i64>().prop_map(|n| json!(n)),
                "[a-z]{0,8}".prop_map(|s| json!(s)),
                any::<bool>().prop_map(|b| json!(b)),
            ]
        }

        /// A write intent before prev_data capture.
        #[derive(Debug, Clone)]
        enum Intent {
            Put(u8, Value),
            Update(u8, Value),
            Delete(u8),
        }

        fn intent_strategy() -> impl Strategy<Value = Intent> {
            prop_oneof![
                (0u8..6, value_strategy()).prop_map(|(k, v)| Intent::Put(k, v)),
                (0u8..6, value_strategy()).prop_map(|(k, v)| Intent::Update(k, v)),
                (0u8..6).prop_map(Intent::Delete),
            ]
        }

        /// Records intents against a state the way a tracked transaction
        /// would, capturing `prev_data` from the evolving state.
        fn record(
            state: &mut BTreeMap<(String, String), Value>,
            intents: Vec<Intent>,
        ) -> Vec<Operation> {
            let mut ops = Vec::new();
            for intent in intents {
                let op = match intent {
                    // Put reverses to a delete, so callers use it for
                    // creation; replacing an existing entity goes through
                    // update, which captures the prior value.
                    Intent::Put(k, v) if state.contains_key(&("nodes".into(), k.to_string())) => {
                        Operation::Update {
                            namespace: "nodes".into(),
                            id: k.to_string(),
                            data: v,
                            prev_data: state.get(&("nodes".into(), k.to_string())).cloned(),
                        }
                    }
                    Intent::Put(k, v) => Operation::Put {
                        namespace: "nodes".into(),
                        id: k.to_string(),
                        data: v,
                    },
                    Intent::Update(k, v) => Operation::Update {
                        namespace: "nodes".into(),
                        id: k.to_string(),
                        data: v,
                        prev_data: state.get(&("nodes".into(), k.to_string())).cloned(),
                    },
                    Intent::Delete(k) => Operation::Delete {
                        namespace: "nodes".into(),
                        id: k.to_string(),
                        prev_data: state.get(&("nodes".into(), k.to_string())).cloned(),
                    },
                };
                apply(state, std::slice::from_ref(&op));
                ops.push(op);
            }
            ops
        }

        proptest! {
            #[test]
            fn reversal_roundtrip(
                base in proptest::collection::btree_map(
                    (0u8..6).prop_map(|k| ("nodes".to_string(), k.to_string())),
                    value_strategy(),
                    0..6,
                ),
                intents in proptest::collection::vec(intent_strategy(), 0..16),
            ) {
                let mut state = base.clone();
                let ops = record(&mut state, intents);
                apply(&mut state, &reverse_operations(&ops));
                prop_assert_eq!(state, base);
            }
        }
    }
}
