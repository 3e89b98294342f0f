//! Property-based tests for lazy list consistency
//!
//! Random edit sequences are applied to a database's lists and mirrored on
//! a plain `Vec` of addresses; the native list must match the model after
//! every step, no address may be freed twice, and views of a removed record
//! must die with it.

use gpod_native::ledger;
use gpod_rs::{GpodError, Itdb, Ownership, Playlist, Record, Track};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Push,
    Insert(usize),
    RemoveAt(usize),
    RemoveItem(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Push),
        2 => any::<usize>().prop_map(Op::Insert),
        2 => any::<usize>().prop_map(Op::RemoveAt),
        1 => any::<usize>().prop_map(Op::RemoveItem),
    ]
}

fn addresses(db: &Itdb) -> Vec<usize> {
    db.tracks().iter().map(|t| t.address()).collect()
}

proptest! {
    #[test]
    fn prop_track_list_matches_model(ops in prop::collection::vec(op(), 1..40)) {
        let rejected = ledger::rejected_frees();
        let db = Itdb::new().unwrap();
        let mut model: Vec<usize> = Vec::new();

        for op in ops {
            match op {
                Op::Push => {
                    let t = Track::new().unwrap();
                    db.tracks().push(&t).unwrap();
                    model.push(t.address());
                }
                Op::Insert(i) => {
                    let t = Track::new().unwrap();
                    let index = i % (model.len() + 1);
                    db.tracks().insert(index, &t).unwrap();
                    model.insert(index, t.address());
                }
                Op::RemoveAt(i) if !model.is_empty() => {
                    let index = i % model.len();
                    let view = db.tracks().get(index).unwrap();
                    let removed = db.tracks().remove_at(index).unwrap();
                    prop_assert_eq!(removed.address(), model.remove(index));
                    prop_assert_eq!(removed.ownership(), Ownership::Owned);
                    prop_assert!(view.handle().is_alive());
                    drop(removed);
                    prop_assert!(!view.handle().is_alive());
                }
                Op::RemoveItem(i) if !model.is_empty() => {
                    let index = i % model.len();
                    let view = db.tracks().get(index).unwrap();
                    let other = db.tracks().get(index).unwrap();
                    prop_assert!(db.tracks().remove(&view).unwrap());
                    prop_assert_eq!(view.ownership(), Ownership::Owned);
                    model.remove(index);
                    drop(view);
                    prop_assert!(!other.handle().is_alive());
                }
                _ => {}
            }

            prop_assert_eq!(db.tracks().len(), model.len());
            prop_assert_eq!(db.track_count(), model.len());
            prop_assert_eq!(addresses(&db), model.clone());
        }

        let all = model.clone();
        db.dispose();
        prop_assert!(all.iter().all(|&a| !ledger::is_live(a)));
        prop_assert_eq!(ledger::rejected_frees(), rejected);
    }

    #[test]
    fn prop_out_of_range_index_is_rejected(len in 0usize..6, extra in 1usize..100) {
        let db = Itdb::new().unwrap();
        for _ in 0..len {
            db.tracks().push(&Track::new().unwrap()).unwrap();
        }
        let index = len + extra;
        let is_oob = |r: Result<(), GpodError>| matches!(r, Err(GpodError::IndexOutOfBounds { .. }));
        prop_assert!(is_oob(db.tracks().get(len).map(|_| ())));
        prop_assert!(is_oob(db.tracks().remove_at(len).map(|_| ())));
        prop_assert!(is_oob(db.tracks().insert(index, &Track::new().unwrap())));
        prop_assert_eq!(db.tracks().len(), len);
    }

    #[test]
    fn prop_removed_tracks_leave_every_playlist(
        tracks in 1usize..8,
        removals in prop::collection::vec(any::<usize>(), 1..8),
    ) {
        let db = Itdb::new().unwrap();
        let lists: Vec<Playlist> = (0..3)
            .map(|i| {
                let pl = Playlist::new(&format!("pl{i}"), false).unwrap();
                db.playlists().push(&pl).unwrap();
                pl
            })
            .collect();
        for _ in 0..tracks {
            let t = Track::new().unwrap();
            db.tracks().push(&t).unwrap();
            for pl in &lists {
                pl.tracks().push(&t).unwrap();
            }
        }

        for r in removals {
            if db.tracks().is_empty() {
                break;
            }
            let removed = db.tracks().remove_at(r % db.tracks().len()).unwrap();
            for pl in &lists {
                prop_assert!(!pl.contains_track(&removed));
                prop_assert_eq!(pl.track_count(), db.track_count());
            }
        }
    }
}

#[test]
fn test_snapshot_is_stable_under_mutation() {
    let db = Itdb::new().unwrap();
    for _ in 0..3 {
        db.tracks().push(&Track::new().unwrap()).unwrap();
    }
    let snapshot = db.tracks().snapshot();
    db.tracks().push(&Track::new().unwrap()).unwrap();
    assert_eq!(snapshot.len(), 3);
    assert_eq!(db.tracks().len(), 4);
    assert_eq!(db.tracks().iter().rev().count(), 4);
}

#[test]
fn test_index_of_and_first() {
    let db = Itdb::new().unwrap();
    assert!(db.tracks().first().is_none());
    let a = Track::new().unwrap();
    let b = Track::new().unwrap();
    db.tracks().push(&a).unwrap();
    db.tracks().insert(0, &b).unwrap();
    assert_eq!(db.tracks().index_of(&a), Some(1));
    assert_eq!(db.tracks().first().unwrap().address(), b.address());
    let loose = Track::new().unwrap();
    assert_eq!(db.tracks().index_of(&loose), None);
    assert!(!db.tracks().contains(&loose));
}
