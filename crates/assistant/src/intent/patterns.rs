//! Keyword pattern families, English and French.
//!
//! Every matcher expects lower-cased input.

use std::sync::LazyLock;

use regex::Regex;

/// Safety and interaction questions.
static SAFETY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(avoid|together|interact\w*|mix(ing)?|safe(ly)?|danger\w*|side[- ]effects?|contraindicat\w*|overdose|too much|pregnan\w*|breastfeed\w*|medications?|medicines?|éviter|ensemble|associer|mélanger|sans danger|dangereu\w*|effets? secondaires?|contre-indi\w*|surdosage|trop de|enceinte|grossesse|allait\w*|médicaments?)\b",
    )
    .expect("Invalid regex")
});

/// Explanatory "what/why" phrasing.
static EXPLANATORY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(why|explain\w*|difference between|how (does|do) [\w-]+ work|what (is|are) (the )?(role|benefits?|difference|purpose|effects?) of|what does [\w-]+ do|pourquoi|expliqu\w*|différence entre|comment (fonctionne|agit)|à quoi sert|quel est le rôle|quels sont les (bienfaits|effets))\b",
    )
    .expect("Invalid regex")
});

/// Timing and spacing questions.
static TIMING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(when (should|to|can|do) i take|what time|at what time|how long (between|before|after)|spac(e|ing)|hours? apart|before or after|morning or evening|quand (prendre|dois-je|faut-il)|à quel moment|quelle heure|combien de temps|espacer|matin ou (le )?soir|avant ou après)\b",
    )
    .expect("Invalid regex")
});

/// Request verbs, paired with [`PRODUCT_NOUN_RE`] after them.
static REQUEST_VERB_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(list|give me|show me|recommend|suggest|i('m| am) looking for|i (want|need) to buy|where can i buy|liste[rz]?|donne[sz]?[- ]moi|montre[sz]?[- ]moi|recommande[rsz]?|conseille[rsz]?[- ]moi|propose[rsz]?[- ]moi|je cherche|je voudrais acheter|où acheter)\b",
    )
    .expect("Invalid regex")
});

static PRODUCT_NOUN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(products?|supplements?|vitamins?|capsules?|gummies|list|produits?|compléments?|suppléments?|vitamines?|gélules?|liste|références?)\b",
    )
    .expect("Invalid regex")
});

static SALE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(on sale|sales?|promos?|promotions?|promotional|discount\w*|deals?|special offers?|clearance|soldes?|en promotion|réductions?|remises?|bons? plans?|offres? spéciales?|déstockage)\b",
    )
    .expect("Invalid regex")
});

/// Words that turn a catalogue name into a collection request.
static COLLECTION_TRIGGER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(collections?|range|ranges|category|categories|line|gammes?|catégories?|rayons?|univers)\b")
        .expect("Invalid regex")
});

static COMBO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(combos?|bundles?|packs?|kits?|stacks?|duo|trio|routine|coffrets?|cure complète|programme complet)\b",
    )
    .expect("Invalid regex")
});

static DEFICIENCY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(lack(ing)?|deficien\w*|insufficien\w*|shortage|low (in|on)|carences?|carencé\w*|manque\w*|déficien\w*|déficit|insuffisan\w*)\b",
    )
    .expect("Invalid regex")
});

/// Generic supplement vocabulary, with no nutrient named.
static SUPPLEMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(supplements?|supplementation|vitamins?|minerals?|capsules?|tablets?|gummies|products?|compléments?|suppléments?|supplémentation|vitamines?|minéraux|gélules?|comprimés?|produits?|cure)\b",
    )
    .expect("Invalid regex")
});

/// Named nutrients with their canonical search term.
static NUTRIENTS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("vitamin b12", r"\b(vitamine?s?\s*b\s*12|b12|cobalamine?)\b"),
        ("vitamin b", r"\b(vitamine?s?\s*b|b[- ]?complex|complexe b)\b"),
        ("vitamin d", r"\b(vitamine?s?\s*d3?|cholécalciférol|cholecalciferol)\b"),
        ("vitamin c", r"\b(vitamine?s?\s*c|acide ascorbique|ascorbic acid)\b"),
        ("vitamin k2", r"\b(vitamine?s?\s*k2?|k2)\b"),
        ("folic acid", r"\b(folic acid|acide folique|folates?|b9)\b"),
        ("magnesium", r"\bmagn[eé]sium\b"),
        ("iron", r"\b(iron|fer)\b"),
        ("zinc", r"\bzinc\b"),
        ("calcium", r"\bcalcium\b"),
        ("omega-3", r"\b(om[eé]ga[- ]?3|fish oil|huile de poisson)\b"),
        ("melatonin", r"\bm[eé]latonine?\b"),
        ("probiotics", r"\bprobioti(c|que)s?\b"),
        ("collagen", r"\bcollag[eè]ne?\b"),
        ("ashwagandha", r"\bashwagandha\b"),
        ("rhodiola", r"\brhodiola\b"),
        ("ginseng", r"\bginseng\b"),
        ("spirulina", r"\bspirulin[ae]\b"),
        ("turmeric", r"\b(turmeric|curcuma|curcumine?)\b"),
        ("coq10", r"\b(coq10|co-?enzyme q10)\b"),
        ("creatine", r"\bcr[eé]atine\b"),
        ("protein", r"\b(whey|prot[eé]ines?|proteins?)\b"),
    ]
    .into_iter()
    .map(|(term, pattern)| (term, Regex::new(pattern).expect("Invalid regex")))
    .collect()
});

#[must_use]
pub fn is_informational(text: &str) -> bool {
    SAFETY_RE.is_match(text) || EXPLANATORY_RE.is_match(text) || TIMING_RE.is_match(text)
}

/// A request verb followed later by a product noun.
#[must_use]
pub fn is_explicit_request(text: &str) -> bool {
    REQUEST_VERB_RE
        .find(text)
        .and_then(|verb| text.get(verb.end()..))
        .is_some_and(|rest| PRODUCT_NOUN_RE.is_match(rest))
}

#[must_use]
pub fn is_sale_request(text: &str) -> bool {
    SALE_RE.is_match(text)
}

#[must_use]
pub fn mentions_collection(text: &str) -> bool {
    COLLECTION_TRIGGER_RE.is_match(text)
}

#[must_use]
pub fn is_combo_request(text: &str) -> bool {
    COMBO_RE.is_match(text)
}

#[must_use]
pub fn is_deficiency(text: &str) -> bool {
    DEFICIENCY_RE.is_match(text)
}

#[must_use]
pub fn mentions_supplement(text: &str) -> bool {
    SUPPLEMENT_RE.is_match(text)
}

/// Canonical nutrient terms found in `text`, ordered by first occurrence.
#[must_use]
pub fn nutrients_in(text: &str) -> Vec<&'static str> {
    let mut found: Vec<(usize, &'static str)> = NUTRIENTS
        .iter()
        .filter_map(|(term, re)| re.find(text).map(|m| (m.start(), *term)))
        .collect();
    found.sort_by_key(|(position, _)| *position);

    let mut terms = Vec::with_capacity(found.len());
    for (_, term) in found {
        if !terms.contains(&term) {
            terms.push(term);
        }
    }
    terms
}

/// The first nutrient named in `text`.
#[must_use]
pub fn first_nutrient(text: &str) -> Option<&'static str> {
    nutrients_in(text).into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_informational_families() {
        assert!(is_informational("which supplements should i avoid taking together?"));
        assert!(is_informational("why is magnesium good for sleep?"));
        assert!(is_informational("when should i take vitamin d?"));
        assert!(is_informational("peut-on prendre du fer enceinte ?"));
        assert!(!is_informational("give me a product list for energy"));
    }

    #[test]
    fn test_explicit_request_needs_noun_after_verb() {
        assert!(is_explicit_request("give me a product list for energy"));
        assert!(is_explicit_request("can you recommend some supplements for sleep"));
        assert!(is_explicit_request("donne-moi des compléments pour dormir"));
        assert!(!is_explicit_request("supplements, give me advice"));
        assert!(!is_explicit_request("which supplements should i avoid taking together?"));
    }

    #[test]
    fn test_combo_does_not_match_safety_phrasing() {
        assert!(is_combo_request("do you have a sleep bundle?"));
        assert!(!is_combo_request("can i combine iron and zinc together?"));
    }

    #[test]
    fn test_nutrients_ordered_by_position() {
        assert_eq!(
            nutrients_in("zinc, then vitamin d3 and magnésium"),
            vec!["zinc", "vitamin d", "magnesium"]
        );
        assert_eq!(first_nutrient("de la vitamine b12 svp"), Some("vitamin b12"));
        assert_eq!(first_nutrient("i feel tired"), None);
    }

    #[test]
    fn test_vitamin_b_does_not_shadow_b12() {
        assert_eq!(nutrients_in("vitamin b12"), vec!["vitamin b12"]);
    }

    #[test]
    fn test_deficiency_and_sale() {
        assert!(is_deficiency("i think i'm lacking iron"));
        assert!(is_deficiency("j'ai une carence en fer"));
        assert!(is_sale_request("what's on sale this week?"));
        assert!(is_sale_request("des promos en ce moment ?"));
        assert!(!is_sale_request("i want to sleep better"));
    }
}
