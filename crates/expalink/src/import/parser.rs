use serde::{Deserialize, Deserializer};
use std::io::Read;

/// Raw CSV row; every cell is optional text until the normalizer validates it.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct DirectoryRow {
    #[serde(default)]
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) name: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) gender: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) image_url: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) nationalities: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) professions: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) specialties: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) cities: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) languages: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) years_experience: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) bio: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) phone: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) email: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) address: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) latitude: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) longitude: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) rating: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) reviews: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) featured: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) plan: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) plan_status: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) subscription_ends_at: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) bio_status: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) identity_status: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) complete: Option<String>,
}

#[derive(Debug)]
pub(crate) struct ParsedRow {
    /// 1-based line in the source file, header included.
    pub(crate) line: u64,
    pub(crate) row: DirectoryRow,
}

pub(crate) fn parse_rows<R: Read>(reader: R) -> Result<Vec<ParsedRow>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let mut rows = Vec::new();

    for record in csv_reader.records() {
        let record = record?;
        let line = record.position().map_or(0, |position| position.line());
        let row: DirectoryRow = record.deserialize(Some(&headers))?;
        rows.push(ParsedRow { line, row });
    }

    Ok(rows)
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
