//! Property-based tests for observable collections and validation state.
//!
//! 1. Every mutation leaves the collection equal to a plain `Vec` model.
//! 2. Change notifications are enough to mirror the collection's length.
//! 3. No-op mutations raise nothing.
//! 4. `has_errors` and `is_valid` never disagree.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use proptest::prelude::*;
use verdant_core::{CollectionChange, ObservableCollection, PredicateValidation, ValidatingObject};

#[derive(Debug, Clone)]
enum Op {
    Push(i16),
    Insert(usize, i16),
    Remove(usize),
    Pop,
    Set(usize, i16),
    Move(usize, usize),
    Extend(Vec<i16>),
    RetainEven,
    Clear,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => any::<i16>().prop_map(Op::Push),
        2 => (0usize..12, any::<i16>()).prop_map(|(i, v)| Op::Insert(i, v)),
        2 => (0usize..12).prop_map(Op::Remove),
        1 => Just(Op::Pop),
        2 => (0usize..12, any::<i16>()).prop_map(|(i, v)| Op::Set(i, v)),
        2 => (0usize..12, 0usize..12).prop_map(|(a, b)| Op::Move(a, b)),
        1 => proptest::collection::vec(any::<i16>(), 0..4).prop_map(Op::Extend),
        1 => Just(Op::RetainEven),
        1 => Just(Op::Clear),
    ]
}

/// Apply `op` to the model, returning whether it should have notified.
fn apply_model(model: &mut Vec<i16>, op: &Op) -> bool {
    match op {
        Op::Push(v) => {
            model.push(*v);
            true
        }
        Op::Insert(i, v) => {
            if *i > model.len() {
                return false;
            }
            model.insert(*i, *v);
            true
        }
        Op::Remove(i) => {
            if *i >= model.len() {
                return false;
            }
            model.remove(*i);
            true
        }
        Op::Pop => model.pop().is_some(),
        Op::Set(i, v) => match model.get_mut(*i) {
            Some(slot) => {
                *slot = *v;
                true
            }
            None => false,
        },
        Op::Move(from, to) => {
            if *from >= model.len() || *to >= model.len() || from == to {
                return false;
            }
            let item = model.remove(*from);
            model.insert(*to, item);
            true
        }
        Op::Extend(values) => {
            model.extend(values.iter().copied());
            !values.is_empty()
        }
        Op::RetainEven => {
            let before = model.len();
            model.retain(|v| v % 2 == 0);
            model.len() != before
        }
        Op::Clear => {
            let had = !model.is_empty();
            model.clear();
            had
        }
    }
}

fn apply_collection(collection: &ObservableCollection<i16>, op: &Op) {
    match op {
        Op::Push(v) => collection.push(*v),
        Op::Insert(i, v) => {
            let _ = collection.insert(*i, *v);
        }
        Op::Remove(i) => {
            collection.remove(*i);
        }
        Op::Pop => {
            collection.pop();
        }
        Op::Set(i, v) => {
            let _ = collection.set(*i, *v);
        }
        Op::Move(from, to) => {
            let _ = collection.move_item(*from, *to);
        }
        Op::Extend(values) => collection.extend(values.iter().copied()),
        Op::RetainEven => collection.retain(|v| v % 2 == 0),
        Op::Clear => collection.clear(),
    }
}

proptest! {
    #[test]
    fn collection_matches_vec_model(ops in proptest::collection::vec(op_strategy(), 0..60)) {
        let collection = ObservableCollection::new();
        let mut model = Vec::new();

        let notified = Rc::new(Cell::new(0usize));
        let mirrored_len = Rc::new(Cell::new(0usize));
        let counter = Rc::clone(&notified);
        let mirror = Rc::clone(&mirrored_len);
        let source = collection.clone();
        let _sub = collection.on_changed(move |change: &CollectionChange| {
            counter.set(counter.get() + 1);
            match *change {
                CollectionChange::Added { count, .. } => mirror.set(mirror.get() + count),
                CollectionChange::Removed { count, .. } => mirror.set(mirror.get() - count),
                CollectionChange::Replaced { .. } | CollectionChange::Moved { .. } => {}
                CollectionChange::Reset => mirror.set(source.len()),
            }
        });

        for op in &ops {
            let before = notified.get();
            let should_notify = apply_model(&mut model, op);
            apply_collection(&collection, op);

            prop_assert_eq!(collection.to_vec(), model.clone(), "after {:?}", op);
            prop_assert_eq!(notified.get() - before, usize::from(should_notify), "after {:?}", op);
            prop_assert_eq!(mirrored_len.get(), model.len());
        }
    }

    #[test]
    fn validity_is_negation_of_errors(values in proptest::collection::vec(-20i32..20, 1..30)) {
        let object = ValidatingObject::new();
        let slot = RefCell::new(0i32);
        object
            .add_validation("n", PredicateValidation::new(|v: &i32| *v >= 0, "negative"), Some(0))
            .expect("rule");
        object
            .add_validation("n", PredicateValidation::new(|v: &i32| *v < 10, "too large"), Some(0))
            .expect("rule");

        for value in values {
            object.set_property("n", &slot, value);
            prop_assert_eq!(object.has_errors(), !object.is_valid());
            let expected = usize::from(value < 0) + usize::from(value >= 10);
            prop_assert_eq!(object.get_errors("n").len(), expected);
        }
    }
}
