use super::domain::Professional;

/// Minimum score before a professional may submit the profile for moderation.
pub const SUBMISSION_THRESHOLD: u8 = 80;
/// Minimum score for online visibility and plan selection.
pub const VISIBILITY_THRESHOLD: u8 = 85;

/// Minimum biography length (in characters) that earns the bio weight.
pub const MIN_BIO_CHARS: usize = 20;

struct ChecklistItem {
    weight: u8,
    satisfied: fn(&Professional) -> bool,
}

const CHECKLIST: &[ChecklistItem] = &[
    ChecklistItem {
        weight: 10,
        satisfied: |pro| !pro.name.trim().is_empty(),
    },
    ChecklistItem {
        weight: 10,
        satisfied: |pro| present(pro.image_url.as_deref()),
    },
    ChecklistItem {
        weight: 10,
        satisfied: |pro| !pro.nationalities.is_empty(),
    },
    ChecklistItem {
        weight: 10,
        satisfied: |pro| present(pro.contact.phone.as_deref()),
    },
    ChecklistItem {
        weight: 10,
        satisfied: |pro| !pro.professions.is_empty(),
    },
    ChecklistItem {
        weight: 5,
        satisfied: |pro| pro.years_of_experience.is_some_and(|years| years > 0),
    },
    ChecklistItem {
        weight: 20,
        satisfied: |pro| pro.bio.chars().count() >= MIN_BIO_CHARS,
    },
    ChecklistItem {
        weight: 10,
        satisfied: |pro| !pro.cities.is_empty(),
    },
    ChecklistItem {
        weight: 10,
        satisfied: |pro| !pro.languages.is_empty(),
    },
    ChecklistItem {
        weight: 5,
        satisfied: |pro| !pro.specialties.is_empty(),
    },
];

fn present(value: Option<&str>) -> bool {
    value.is_some_and(|inner| !inner.trim().is_empty())
}

/// Weighted completeness percentage in `0..=100`.
pub fn completion_score(profile: &Professional) -> u8 {
    let total: u32 = CHECKLIST
        .iter()
        .filter(|item| (item.satisfied)(profile))
        .map(|item| u32::from(item.weight))
        .sum();
    total.min(100) as u8
}

pub fn can_submit(profile: &Professional) -> bool {
    completion_score(profile) >= SUBMISSION_THRESHOLD
}

pub fn meets_visibility_threshold(profile: &Professional) -> bool {
    completion_score(profile) >= VISIBILITY_THRESHOLD
}
