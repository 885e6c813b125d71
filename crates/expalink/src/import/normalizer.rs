use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};

use super::parser::DirectoryRow;
use crate::marketplace::geo::coordinates_in_range;
use crate::marketplace::{
    title_case, BioVerificationStatus, Gender, PlanStatus, PlanTier, Professional,
    ProfessionalId, VerificationStatus, DEFAULT_RATING,
};

const LIST_SEPARATOR: char = ';';

/// Builds the stored record from a raw row. The online flag is left for the caller.
pub(crate) fn build_professional(row: DirectoryRow) -> Result<Professional, String> {
    let id = collapse_whitespace(&row.id);
    if id.is_empty() {
        return Err("id is required".to_string());
    }

    let mut pro = Professional::new(ProfessionalId(id), collapse_whitespace(&row.name));
    pro.gender = parse_gender(row.gender.as_deref());
    pro.image_url = row.image_url;
    pro.nationalities = split_list(row.nationalities.as_deref());
    pro.professions = split_list(row.professions.as_deref());
    pro.specialties = split_list(row.specialties.as_deref());
    pro.cities = split_list(row.cities.as_deref())
        .iter()
        .map(|city| title_case(city))
        .collect();
    pro.languages = split_list(row.languages.as_deref());
    pro.years_of_experience = parse_number("years_experience", row.years_experience.as_deref())?;
    pro.bio = row.bio.map(|bio| bio.trim().to_string()).unwrap_or_default();

    pro.contact.phone = row.phone;
    pro.contact.email = row.email;
    pro.contact.address = row.address;

    let latitude: Option<f64> = parse_number("latitude", row.latitude.as_deref())?;
    let longitude: Option<f64> = parse_number("longitude", row.longitude.as_deref())?;
    match (latitude, longitude) {
        (Some(lat), Some(lng)) => {
            if !coordinates_in_range(lat, lng) {
                return Err(format!("coordinates out of range: {lat}, {lng}"));
            }
            pro.latitude = Some(lat);
            pro.longitude = Some(lng);
        }
        (None, None) => {}
        _ => return Err("latitude and longitude must be supplied together".to_string()),
    }

    let rating: Option<f32> = parse_number("rating", row.rating.as_deref())?;
    pro.rating = rating.unwrap_or(DEFAULT_RATING);
    if !(0.0..=5.0).contains(&pro.rating) {
        return Err(format!("rating {} is outside 0-5", pro.rating));
    }
    pro.review_count = parse_number("reviews", row.reviews.as_deref())?.unwrap_or(0);

    pro.plan = match row.plan.as_deref() {
        Some(raw) => Some(PlanTier::parse(raw).ok_or_else(|| format!("unknown plan '{raw}'"))?),
        None => None,
    };
    pro.plan_status = row.plan_status.as_deref().map(parse_plan_status).transpose()?;
    pro.subscription_ends_at = row
        .subscription_ends_at
        .as_deref()
        .map(parse_timestamp)
        .transpose()?;
    pro.is_featured = parse_flag("featured", row.featured.as_deref())?
        && pro.plan.is_some_and(PlanTier::is_paid);

    pro.bio_verification_status = match row.bio_status.as_deref() {
        Some(raw) => parse_bio_status(raw)?,
        None => BioVerificationStatus::Pending,
    };
    pro.verification_status = match row.identity_status.as_deref() {
        Some(raw) => parse_identity_status(raw)?,
        None => VerificationStatus::None,
    };
    pro.verified = pro.verification_status == VerificationStatus::Verified;
    pro.is_pro_complete = parse_flag("complete", row.complete.as_deref())?;

    Ok(pro)
}

pub(crate) fn collapse_whitespace(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(crate) fn split_list(value: Option<&str>) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    for item in value.unwrap_or_default().split(LIST_SEPARATOR) {
        let item = collapse_whitespace(item);
        if !item.is_empty() && !items.contains(&item) {
            items.push(item);
        }
    }
    items
}

fn parse_number<T: FromStr>(column: &str, value: Option<&str>) -> Result<Option<T>, String> {
    value
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|_| format!("{column} '{raw}' is not a valid number"))
        })
        .transpose()
}

fn parse_flag(column: &str, value: Option<&str>) -> Result<bool, String> {
    match value.map(|raw| raw.trim().to_ascii_lowercase()).as_deref() {
        None | Some("false" | "no" | "n" | "0") => Ok(false),
        Some("true" | "yes" | "y" | "1") => Ok(true),
        Some(other) => Err(format!("{column} '{other}' is not a yes/no value")),
    }
}

fn parse_gender(value: Option<&str>) -> Gender {
    match value.map(|raw| raw.trim().to_ascii_lowercase()).as_deref() {
        Some("female" | "f" | "woman") => Gender::Female,
        Some("male" | "m" | "man") => Gender::Male,
        _ => Gender::PreferNotToSay,
    }
}

fn parse_plan_status(value: &str) -> Result<PlanStatus, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "active" | "trialing" => Ok(PlanStatus::Active),
        "cancelling" | "canceling" | "cancel_at_period_end" => Ok(PlanStatus::Cancelling),
        "expired" | "canceled" | "cancelled" => Ok(PlanStatus::Expired),
        other => Err(format!("unknown plan status '{other}'")),
    }
}

fn parse_bio_status(value: &str) -> Result<BioVerificationStatus, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "pending" => Ok(BioVerificationStatus::Pending),
        "approved" | "verified" => Ok(BioVerificationStatus::Approved),
        "rejected" => Ok(BioVerificationStatus::Rejected),
        other => Err(format!("unknown bio status '{other}'")),
    }
}

fn parse_identity_status(value: &str) -> Result<VerificationStatus, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "none" => Ok(VerificationStatus::None),
        "pending" => Ok(VerificationStatus::Pending),
        "verified" | "approved" => Ok(VerificationStatus::Verified),
        "rejected" => Ok(VerificationStatus::Rejected),
        other => Err(format!("unknown identity status '{other}'")),
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, String> {
    let trimmed = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("subscription_ends_at '{trimmed}' is not a date"))
}
