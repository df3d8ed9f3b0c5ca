//! Bounded undo/redo history for the active document.

use std::collections::VecDeque;

use roadmapper_core::{reduce, Action, RoadmapDocument, Timestamp};

/// Snapshots kept for undo when no cap is configured
pub const DEFAULT_HISTORY_CAP: usize = 50;

/// Past and future snapshots around the present document.
///
/// Every edit that changes the document pushes the previous present onto
/// `past` (dropping the oldest beyond the cap) and clears `future`.
/// Loading a snapshot clears both stacks.
#[derive(Debug, Clone)]
pub struct History {
    past: VecDeque<RoadmapDocument>,
    present: RoadmapDocument,
    future: VecDeque<RoadmapDocument>,
    cap: usize,
}

impl History {
    /// Start with `present` and no history, keeping at most `cap` undo steps
    pub fn new(present: RoadmapDocument, cap: usize) -> Self {
        Self {
            past: VecDeque::new(),
            present,
            future: VecDeque::new(),
            cap,
        }
    }

    /// The document currently shown
    pub fn present(&self) -> &RoadmapDocument {
        &self.present
    }

    /// Apply an action; returns true if the present document changed
    pub fn dispatch(&mut self, action: Action, now: Timestamp) -> bool {
        match action {
            Action::Undo => self.undo(),
            Action::Redo => self.redo(),
            Action::LoadState(doc) => {
                self.load(doc);
                true
            }
            action => match reduce(&self.present, action, now) {
                Some(next) => self.commit(next),
                None => false,
            },
        }
    }

    /// Make an already computed document the present, recording the old one
    pub fn commit(&mut self, next: RoadmapDocument) -> bool {
        if next == self.present {
            return false;
        }
        let previous = std::mem::replace(&mut self.present, next);
        if self.cap > 0 {
            self.past.push_back(previous);
            while self.past.len() > self.cap {
                self.past.pop_front();
            }
        }
        self.future.clear();
        true
    }

    /// Step back one edit; false if there is nothing to undo
    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.past.pop_back() else {
            return false;
        };
        let current = std::mem::replace(&mut self.present, previous);
        self.future.push_front(current);
        true
    }

    /// Re-apply the last undone edit; false if there is nothing to redo
    pub fn redo(&mut self) -> bool {
        let Some(next) = self.future.pop_front() else {
            return false;
        };
        let current = std::mem::replace(&mut self.present, next);
        self.past.push_back(current);
        true
    }

    /// Replace the present and forget all history
    pub fn load(&mut self, doc: RoadmapDocument) {
        self.present = doc;
        self.clear();
    }

    /// Drop both stacks, keeping the present
    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }

    /// Whether an undo step is available
    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    /// Whether a redo step is available
    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Number of recorded undo steps
    pub fn undo_count(&self) -> usize {
        self.past.len()
    }

    /// Number of recorded redo steps
    pub fn redo_count(&self) -> usize {
        self.future.len()
    }

    /// Maximum number of undo steps kept
    pub fn cap(&self) -> usize {
        self.cap
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use roadmapper_core::{EntryPatch, LineStyle, Orientation, RoadmapId};

    use super::*;

    fn start() -> RoadmapDocument {
        RoadmapDocument::new_default(1_000)
    }

    fn arb_action() -> impl Strategy<Value = Action> {
        prop_oneof![
            "[a-z]{1,6}".prop_map(|title| Action::AddEntry(EntryPatch::title(title))),
            "[A-Z][a-z]{0,8}".prop_map(Action::SetTitle),
            prop_oneof![Just("ocean"), Just("forest"), Just("sunset")]
                .prop_map(|theme| Action::SetTheme(theme.to_string())),
            prop::sample::select(Orientation::ALL).prop_map(Action::SetOrientation),
            prop::sample::select(LineStyle::ALL).prop_map(Action::SetLineStyle),
        ]
    }

    #[test]
    fn undo_then_redo_walks_the_stacks() {
        let mut history = History::new(start(), DEFAULT_HISTORY_CAP);
        let initial = history.present().clone();
        assert!(history.dispatch(Action::AddEntry(EntryPatch::title("X")), 2_000));
        let edited = history.present().clone();

        assert!(history.dispatch(Action::Undo, 3_000));
        assert_eq!(history.present(), &initial);
        assert!(history.can_redo());

        assert!(history.dispatch(Action::Redo, 4_000));
        assert_eq!(history.present(), &edited);
        assert!(!history.can_redo());
    }

    #[test]
    fn undo_on_empty_history_is_a_no_op() {
        let mut history = History::new(start(), DEFAULT_HISTORY_CAP);
        assert!(!history.undo());
        assert!(!history.redo());
    }

    #[test]
    fn no_op_actions_do_not_touch_history() {
        let mut history = History::new(start(), DEFAULT_HISTORY_CAP);
        assert!(!history.dispatch(Action::SetTitle("My Roadmap".into()), 2_000));
        assert!(!history.can_undo());
    }

    #[test]
    fn new_action_clears_the_future() {
        let mut history = History::new(start(), DEFAULT_HISTORY_CAP);
        history.dispatch(Action::SetTitle("A".into()), 2_000);
        history.dispatch(Action::Undo, 2_001);
        assert_eq!(history.redo_count(), 1);
        history.dispatch(Action::SetTitle("B".into()), 2_002);
        assert_eq!(history.redo_count(), 0);
        assert_eq!(history.undo_count(), 1);
    }

    #[test]
    fn load_state_clears_both_stacks() {
        let mut history = History::new(start(), DEFAULT_HISTORY_CAP);
        history.dispatch(Action::SetTitle("A".into()), 2_000);
        history.dispatch(Action::SetTitle("B".into()), 2_001);
        history.dispatch(Action::Undo, 2_002);

        let loaded = RoadmapDocument::empty(RoadmapId::from("other"), "Other", 5);
        assert!(history.dispatch(Action::LoadState(loaded.clone()), 2_003));
        assert_eq!(history.present(), &loaded);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn past_is_capped() {
        let cap = 5;
        let mut history = History::new(start(), cap);
        for i in 0..cap + 10 {
            history.dispatch(Action::SetTitle(format!("t{i}")), 2_000 + i as i64);
        }
        assert_eq!(history.undo_count(), cap);
        while history.undo() {}
        assert_eq!(history.present().title, "t9");
    }

    proptest! {
        #[test]
        fn undoing_everything_returns_to_the_start(
            actions in prop::collection::vec(arb_action(), 0..30),
        ) {
            let initial = start();
            let mut history = History::new(initial.clone(), 100);
            let mut now = 2_000;
            let mut changes = 0;
            for action in actions {
                now += 1;
                if history.dispatch(action, now) {
                    changes += 1;
                }
            }
            let last = history.present().clone();
            prop_assert_eq!(history.undo_count(), changes);

            for _ in 0..changes {
                prop_assert!(history.undo());
            }
            prop_assert_eq!(history.present(), &initial);

            for _ in 0..changes {
                prop_assert!(history.redo());
            }
            prop_assert_eq!(history.present(), &last);
        }

        #[test]
        fn stacks_never_exceed_the_cap(
            cap in 0usize..8,
            actions in prop::collection::vec(arb_action(), 0..40),
            undos in 0usize..10,
        ) {
            let mut history = History::new(start(), cap);
            for (i, action) in actions.into_iter().enumerate() {
                history.dispatch(action, 2_000 + i as i64);
            }
            for _ in 0..undos {
                history.undo();
            }
            prop_assert!(history.undo_count() + history.redo_count() <= cap);
        }
    }
}
