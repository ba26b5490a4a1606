//! State machine for the augmentation pass.
//!
//! The pass moves through a fixed forward order of states; which states run
//! is decided here, from configuration and from earlier outcomes, so the
//! skip and fallback rules can be tested without any network calls. The
//! driver in [`super`] performs the actual classifier and lookup calls and
//! feeds each result back through [`Machine::advance`].

/// States of the augmentation pass, in fixed forward order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum State {
    /// Is the input entirely in English?
    LanguageCheck,
    /// Does the request target the local computer system?
    TopicClassification,
    /// Does the raw input suit a direct fact lookup?
    FactApiSuitability,
    /// Distill a self-contained factual question from the request.
    ContextualQueryGeneration,
    /// Answer the generated question.
    ContextualQueryAnswering,
    /// The pass is over.
    Done,
}

/// Configuration inputs that decide which states run.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Flags {
    pub assume_english: bool,
    pub offer_system_commands: bool,
    pub fact_source_available: bool,
    pub augmentation_enabled: bool,
}

/// What the current state concluded, as far as routing is concerned.
///
/// Most states report [`StepOutcome::Advance`]; the other variants are each
/// meaningful in exactly one state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StepOutcome {
    /// Move forward to whatever state comes next.
    Advance,
    /// [`State::LanguageCheck`]: input not confirmed English, fact usage is
    /// disabled for the rest of the pass.
    NotEnglish,
    /// [`State::TopicClassification`]: terminal, the caller routes the
    /// request to its own command handling.
    SystemTask,
    /// [`State::FactApiSuitability`]: terminal, the fact service already
    /// answered the input.
    DirectAnswer,
    /// The step failed or produced nothing usable; the pass ends without
    /// augmenting.
    Degrade,
}

#[derive(Debug)]
pub(crate) struct Machine {
    state: State,
    flags: Flags,
    english: bool,
}

impl Machine {
    /// The language verdict only gates fact usage, so the check is skipped
    /// whenever no fact lookup could happen anyway.
    pub(crate) fn new(flags: Flags) -> Self {
        let mut machine = Self { state: State::LanguageCheck, flags, english: true };
        let language_matters =
            !flags.assume_english && flags.augmentation_enabled && flags.fact_source_available;
        if !language_matters {
            machine.state = machine.after_language();
        }
        machine
    }

    pub(crate) fn state(&self) -> State {
        self.state
    }

    /// Whether the input is treated as English. Starts true and is cleared
    /// only by a [`StepOutcome::NotEnglish`] language verdict.
    pub(crate) fn english(&self) -> bool {
        self.english
    }

    /// The transition table.
    pub(crate) fn advance(&mut self, outcome: StepOutcome) {
        self.state = match (self.state, outcome) {
            (State::LanguageCheck, StepOutcome::NotEnglish) => {
                self.english = false;
                self.after_language()
            }
            (State::LanguageCheck, _) => self.after_language(),
            (State::TopicClassification, StepOutcome::SystemTask) => State::Done,
            (State::TopicClassification, _) => self.after_topic(),
            (State::FactApiSuitability, StepOutcome::DirectAnswer) => State::Done,
            (State::FactApiSuitability, _) => State::ContextualQueryGeneration,
            (State::ContextualQueryGeneration, StepOutcome::Degrade) => State::Done,
            (State::ContextualQueryGeneration, _) => State::ContextualQueryAnswering,
            (State::ContextualQueryAnswering, _) => State::Done,
            (State::Done, _) => State::Done,
        };
    }

    fn after_language(&self) -> State {
        if self.flags.offer_system_commands {
            State::TopicClassification
        } else {
            self.after_topic()
        }
    }

    fn after_topic(&self) -> State {
        if !self.flags.augmentation_enabled {
            State::Done
        } else if self.flags.fact_source_available && self.english {
            State::FactApiSuitability
        } else {
            State::ContextualQueryGeneration
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_on() -> Flags {
        Flags {
            assume_english: false,
            offer_system_commands: true,
            fact_source_available: true,
            augmentation_enabled: true,
        }
    }

    #[test]
    fn full_pass_visits_every_state_in_order() {
        let mut machine = Machine::new(all_on());
        let mut visited = vec![machine.state()];
        while machine.state() != State::Done {
            machine.advance(StepOutcome::Advance);
            visited.push(machine.state());
        }
        assert_eq!(
            visited,
            [
                State::LanguageCheck,
                State::TopicClassification,
                State::FactApiSuitability,
                State::ContextualQueryGeneration,
                State::ContextualQueryAnswering,
                State::Done,
            ]
        );
    }

    #[test]
    fn assume_english_skips_the_language_check() {
        let machine = Machine::new(Flags { assume_english: true, ..all_on() });
        assert_eq!(machine.state(), State::TopicClassification);
        assert!(machine.english());
    }

    #[test]
    fn language_check_is_skipped_when_no_fact_lookup_can_happen() {
        let machine = Machine::new(Flags { fact_source_available: false, ..all_on() });
        assert_eq!(machine.state(), State::TopicClassification);

        let machine = Machine::new(Flags {
            offer_system_commands: false,
            fact_source_available: false,
            ..all_on()
        });
        assert_eq!(machine.state(), State::ContextualQueryGeneration);
    }

    #[test]
    fn non_english_input_never_reaches_fact_suitability() {
        let mut machine = Machine::new(Flags { offer_system_commands: false, ..all_on() });
        assert_eq!(machine.state(), State::LanguageCheck);
        machine.advance(StepOutcome::NotEnglish);
        assert_eq!(machine.state(), State::ContextualQueryGeneration);
        assert!(!machine.english());
    }

    #[test]
    fn system_task_is_terminal() {
        let mut machine = Machine::new(Flags { assume_english: true, ..all_on() });
        machine.advance(StepOutcome::SystemTask);
        assert_eq!(machine.state(), State::Done);
    }

    #[test]
    fn direct_answer_is_terminal() {
        let mut machine = Machine::new(Flags {
            assume_english: true,
            offer_system_commands: false,
            ..all_on()
        });
        assert_eq!(machine.state(), State::FactApiSuitability);
        machine.advance(StepOutcome::DirectAnswer);
        assert_eq!(machine.state(), State::Done);
    }

    #[test]
    fn unsuitable_input_falls_through_to_generation() {
        let mut machine = Machine::new(Flags {
            assume_english: true,
            offer_system_commands: false,
            ..all_on()
        });
        machine.advance(StepOutcome::Advance);
        assert_eq!(machine.state(), State::ContextualQueryGeneration);
    }

    #[test]
    fn degraded_generation_ends_the_pass() {
        let mut machine = Machine::new(Flags {
            assume_english: true,
            offer_system_commands: false,
            fact_source_available: false,
            ..all_on()
        });
        assert_eq!(machine.state(), State::ContextualQueryGeneration);
        machine.advance(StepOutcome::Degrade);
        assert_eq!(machine.state(), State::Done);
    }

    #[test]
    fn augmentation_disabled_ends_after_topic_classification() {
        let mut machine = Machine::new(Flags { augmentation_enabled: false, ..all_on() });
        assert_eq!(machine.state(), State::TopicClassification);
        machine.advance(StepOutcome::Advance);
        assert_eq!(machine.state(), State::Done);
    }

    #[test]
    fn nothing_enabled_means_nothing_to_do() {
        let machine = Machine::new(Flags {
            assume_english: false,
            offer_system_commands: false,
            fact_source_available: true,
            augmentation_enabled: false,
        });
        assert_eq!(machine.state(), State::Done);
    }
}
