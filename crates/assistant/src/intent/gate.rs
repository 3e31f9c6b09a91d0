//! Ordered rules deciding whether product search may run.

use vitaguide_core::SearchGate;

/// Boolean signals the gate rules read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Signals {
    pub explicit_request: bool,
    pub informational: bool,
    pub sale: bool,
    pub collection: bool,
    pub combo: bool,
    pub deficiency: bool,
    pub specific_supplement: bool,
    pub supplement_in_message: bool,
    pub supplement_in_reply: bool,
    pub has_goal: bool,
}

type Rule = (SearchGate, fn(&Signals) -> bool);

/// Evaluated top to bottom; the first matching rule decides.
pub const GATE_RULES: [Rule; 5] = [
    (SearchGate::ExplicitRequest, explicit_request),
    (SearchGate::ModifierRequest, modifier_request),
    (SearchGate::Deficiency, deficiency),
    (SearchGate::Informational, informational),
    (SearchGate::SupplementSignal, supplement_signal),
];

const fn explicit_request(s: &Signals) -> bool {
    s.explicit_request && !s.informational
}

const fn modifier_request(s: &Signals) -> bool {
    s.sale || s.collection || s.combo
}

const fn deficiency(s: &Signals) -> bool {
    s.deficiency
}

const fn informational(s: &Signals) -> bool {
    s.informational
}

const fn supplement_signal(s: &Signals) -> bool {
    s.specific_supplement || s.supplement_in_message || (s.supplement_in_reply && s.has_goal)
}

/// Which rule decides for `signals`.
#[must_use]
pub fn decide(signals: &Signals) -> SearchGate {
    GATE_RULES
        .iter()
        .find(|(_, applies)| applies(signals))
        .map_or(SearchGate::NoSignal, |(gate, _)| *gate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_informational_blocks_supplement_signals() {
        let signals = Signals {
            informational: true,
            specific_supplement: true,
            supplement_in_message: true,
            ..Signals::default()
        };
        assert_eq!(decide(&signals), SearchGate::Informational);
        assert!(!decide(&signals).permits());
    }

    #[test]
    fn test_explicit_request_must_not_be_informational() {
        let mut explicit = Signals {
            explicit_request: true,
            informational: true,
            ..Signals::default()
        };
        assert_eq!(decide(&explicit), SearchGate::Informational);
        assert!(!decide(&explicit).permits());

        explicit.informational = false;
        assert_eq!(decide(&explicit), SearchGate::ExplicitRequest);
    }

    #[test]
    fn test_modifiers_and_deficiency_beat_informational() {
        let sale = Signals {
            sale: true,
            informational: true,
            ..Signals::default()
        };
        assert_eq!(decide(&sale), SearchGate::ModifierRequest);

        let deficiency = Signals {
            deficiency: true,
            informational: true,
            ..Signals::default()
        };
        assert_eq!(decide(&deficiency), SearchGate::Deficiency);
    }

    #[test]
    fn test_reply_mention_needs_a_goal() {
        let mut signals = Signals {
            supplement_in_reply: true,
            ..Signals::default()
        };
        assert_eq!(decide(&signals), SearchGate::NoSignal);

        signals.has_goal = true;
        assert_eq!(decide(&signals), SearchGate::SupplementSignal);
    }
}
