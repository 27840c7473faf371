#![no_main]

use arbitrary::Arbitrary;
use figlay_core::{
    KeyArg, KeyCodec, KeyCollisionPolicy, PanelId, PanelRegistry, PlacementKey, Registrable,
};
use libfuzzer_sys::fuzz_target;

#[derive(Debug)]
struct Stub(PanelId);

impl Registrable for Stub {
    fn panel_id(&self) -> PanelId {
        self.0
    }
}

#[derive(Debug, Arbitrary)]
enum Op {
    Add { slot: u8, label: bool },
    Readd(u8),
    Remove(u8),
    Bubble(u8),
    Clear,
}

#[derive(Debug, Arbitrary)]
struct Input {
    reject: bool,
    ops: Vec<Op>,
}

fn key(slot: u8, label: bool) -> PlacementKey {
    let label = KeyArg::from(if label { "a" } else { "" });
    KeyCodec::encode(&[KeyArg::Int(i64::from(slot % 8))], [("label", &label)])
}

fn pick(reg: &PanelRegistry<Stub>, n: u8) -> Option<PanelId> {
    let ids = reg.ids();
    (!ids.is_empty()).then(|| ids[usize::from(n) % ids.len()])
}

fuzz_target!(|input: Input| {
    if input.ops.len() > 256 {
        return;
    }
    let policy = if input.reject {
        KeyCollisionPolicy::Reject
    } else {
        KeyCollisionPolicy::Replace
    };
    let mut reg = PanelRegistry::with_policy(policy);

    for op in input.ops {
        let before = reg.generation();
        match op {
            Op::Add { slot, label } => {
                let _ = reg.add(key(slot, label), Stub(PanelId::next()));
            }
            Op::Readd(n) => {
                if let Some(id) = pick(&reg, n) {
                    let outcome = reg.add(key(n, false), Stub(id));
                    assert!(matches!(outcome, Ok(o) if !o.inserted()));
                }
            }
            Op::Remove(n) => {
                if let Some(id) = pick(&reg, n) {
                    assert_eq!(reg.remove(id).map(|p| p.0), Ok(id));
                    assert!(!reg.contains(id));
                }
            }
            Op::Bubble(n) => {
                if let Some(id) = pick(&reg, n) {
                    assert!(reg.bubble(id).is_ok());
                    assert_eq!(reg.current().map(Registrable::panel_id), Some(id));
                }
            }
            Op::Clear => {
                reg.clear();
                assert!(reg.is_empty() && reg.current().is_none());
            }
        }
        assert!(reg.generation() >= before);

        // Insertion order is strictly increasing and every key resolves back.
        let ids = reg.ids();
        assert_eq!(ids.len(), reg.len());
        let mut last = None;
        for id in &ids {
            let index = reg.index_of(*id);
            assert!(index > last);
            last = index;
            let key = reg.key_of(*id).expect("registered panel has a key");
            assert_eq!(reg.get(key).map(Registrable::panel_id), Some(*id));
        }
        assert_eq!(reg.current().is_some(), !reg.is_empty());
    }
});
