//! Canned intake texts.
//!
//! Calm, preparatory framing throughout; the only urgent wording in the
//! engine is the emergency banner owned by the policy rule set.

use super::types::Urgency;

pub struct IntakeMessages;

impl IntakeMessages {
    pub fn greeting() -> &'static str {
        "Hello — I can help you think through your symptoms and which kind of \
         care might fit. What are you noticing? You can list several things."
    }

    pub fn greeting_ack() -> &'static str {
        "Hello — thanks for sharing that."
    }

    pub fn reask_symptoms() -> &'static str {
        "I didn't catch any symptoms there. Could you describe what you're \
         feeling — for example headache, cough, or stomach pain?"
    }

    pub fn ask_duration() -> &'static str {
        "How long has this been going on?"
    }

    pub fn reask_duration() -> &'static str {
        "Roughly how long — a few hours, days, or weeks?"
    }

    pub fn ask_severity() -> &'static str {
        "How strong would you say it is — mild, moderate, or severe?"
    }

    pub fn reask_severity() -> &'static str {
        "A rough sense is enough: would you call it mild, moderate, or severe?"
    }

    pub fn recommendation(departments: &[String], urgency: Urgency) -> String {
        let list = departments.join(", ");
        let timing = match urgency {
            Urgency::Urgent => " Given how strong this feels, it would be sensible to arrange that soon.",
            _ => "",
        };
        format!(
            "Thanks — based on what you've shared, it could make sense to book \
             an appointment with: {list}.{timing} If anything changes markedly \
             for the worse, please seek care sooner."
        )
    }

    pub fn generic_recommendation() -> &'static str {
        "We've covered a lot without narrowing things down, so the most \
         helpful next step is to see a doctor in person — General Medicine is \
         a good starting point."
    }

    pub fn emergency_termination() -> &'static str {
        "I'm pausing our intake here so you can get help right away — what \
         you describe should be looked at by emergency services, not a chat."
    }

    pub fn session_closed() -> &'static str {
        "This conversation has ended. Please start a new one if there is \
         anything else you'd like to look into."
    }
}
