#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use indexstack::{IndexStack, Slot, SlotIndex};

#[derive(Arbitrary, Debug)]
enum Action {
    TryPop,
    Acquire,
    Push(usize),
    Release(usize),
    Drain,
}

use self::Action::*;

fn pick<A>(held: &[A], index: usize) -> Option<usize> {
    if held.is_empty() {
        None
    } else {
        Some(index % held.len())
    }
}

fuzz_target!(|input: (u8, Vec<Action>)| {
    let capacity = input.0 as usize + 1;
    let mut stack = IndexStack::new(capacity).unwrap();
    // The stack as it should be, top last.
    let mut model: Vec<SlotIndex> = (0..capacity as u32).rev().map(SlotIndex::new).collect();
    let mut held: Vec<SlotIndex> = Vec::new();
    let mut guarded: Vec<SlotIndex> = Vec::new();
    for action in input.1 {
        match action {
            TryPop => {
                let index = stack.try_pop();
                assert_eq!(model.pop().unwrap_or(SlotIndex::NULL), index);
                if index.is_valid() {
                    held.push(index);
                }
            }
            Acquire => {
                if let Some(slot) = stack.acquire() {
                    assert_eq!(model.pop(), Some(slot.index()));
                    guarded.push(Slot::into_index(slot));
                } else {
                    assert!(model.is_empty());
                }
            }
            Push(index) => {
                if let Some(index) = pick(&held, index) {
                    let index = held.swap_remove(index);
                    stack.push(index);
                    model.push(index);
                }
            }
            Release(index) => {
                if let Some(index) = pick(&guarded, index) {
                    let index = guarded.swap_remove(index);
                    drop(Slot::from_index(&stack, index));
                    model.push(index);
                }
            }
            Drain => {
                let drained: Vec<SlotIndex> = stack.drain().collect();
                let expected: Vec<SlotIndex> = model.drain(..).rev().collect();
                assert_eq!(expected, drained);
                held.extend(drained);
            }
        }
        assert_eq!(model.last().cloned().unwrap_or(SlotIndex::NULL), stack.top());
    }
    let chain: Vec<SlotIndex> = stack.chain().collect();
    let expected: Vec<SlotIndex> = model.iter().rev().cloned().collect();
    assert_eq!(expected, chain);
});
