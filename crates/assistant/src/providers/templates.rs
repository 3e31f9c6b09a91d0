//! Degraded replies used when no completion provider can answer.
//!
//! The topic is picked from the user's own message with plain keyword
//! matching, so this path has no dependency that could fail.

use std::sync::LazyLock;

use regex::Regex;
use vitaguide_core::Language;

/// Broad topic of a message, for picking a degraded reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    /// Interactions, side effects, medication, pregnancy.
    Safety,
    /// Deficiencies and shortfalls.
    Deficiency,
    /// Asking for products.
    Product,
    General,
}

static SAFETY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(interact\w*|together|combin\w*|avoid|safe|danger\w*|side[- ]effects?|medications?|medicines?|drugs?|pregnan\w*|breastfeed\w*|ensemble|éviter|risques?|effets? secondaires?|médicaments?|enceinte|grossesse|allait\w*|contre-indi\w*)\b",
    )
    .expect("Invalid regex")
});

static DEFICIENCY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(lack\w*|deficien\w*|shortage|carences?|manque\w*|déficien\w*|déficit)\b")
        .expect("Invalid regex")
});

static PRODUCT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(products?|supplements?|recommend\w*|buy|price|produits?|compléments?|suppléments?|recommand\w*|conseill\w*|acheter|prix)\b",
    )
    .expect("Invalid regex")
});

/// Classify a user message into a degraded-reply topic.
///
/// Safety wins over everything else so an interaction question never gets a
/// product-flavoured answer.
#[must_use]
pub fn topic_of(message: &str) -> Topic {
    let lower = message.to_lowercase();
    if SAFETY_RE.is_match(&lower) {
        Topic::Safety
    } else if DEFICIENCY_RE.is_match(&lower) {
        Topic::Deficiency
    } else if PRODUCT_RE.is_match(&lower) {
        Topic::Product
    } else {
        Topic::General
    }
}

/// The localized reply for a topic.
#[must_use]
pub const fn reply_for(topic: Topic, language: Language) -> &'static str {
    match (language, topic) {
        (Language::En, Topic::Safety) => {
            "Our assistant is temporarily unavailable. For questions about combining supplements, side effects, or medication, please ask your doctor or pharmacist: they can check your situation safely. Please try again in a few minutes."
        }
        (Language::En, Topic::Deficiency) => {
            "Our assistant is temporarily unavailable. If you suspect a deficiency, a blood test prescribed by your doctor is the most reliable way to confirm it before taking supplements. Please try again in a few minutes."
        }
        (Language::En, Topic::Product) => {
            "Our assistant is temporarily unavailable. You can still browse our collections in the shop, and our team is happy to help you choose. Please try again in a few minutes."
        }
        (Language::En, Topic::General) => {
            "Our assistant is temporarily unavailable. Please try again in a few minutes."
        }
        (Language::Fr, Topic::Safety) => {
            "Notre assistant est momentanément indisponible. Pour toute question sur l'association de compléments, les effets secondaires ou les médicaments, demandez conseil à votre médecin ou pharmacien. Merci de réessayer dans quelques minutes."
        }
        (Language::Fr, Topic::Deficiency) => {
            "Notre assistant est momentanément indisponible. En cas de carence supposée, une prise de sang prescrite par votre médecin reste le moyen le plus fiable de la confirmer avant de vous supplémenter. Merci de réessayer dans quelques minutes."
        }
        (Language::Fr, Topic::Product) => {
            "Notre assistant est momentanément indisponible. Vous pouvez parcourir nos collections dans la boutique, et notre équipe vous aidera volontiers à choisir. Merci de réessayer dans quelques minutes."
        }
        (Language::Fr, Topic::General) => {
            "Notre assistant est momentanément indisponible. Merci de réessayer dans quelques minutes."
        }
    }
}

/// Degraded reply for a user message. Never fails.
#[must_use]
pub fn degraded_reply(message: &str, language: Language) -> String {
    reply_for(topic_of(message), language).to_string()
}
