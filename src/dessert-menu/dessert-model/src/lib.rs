//! Dessert catalog and recipe model.
//!
//! Decodes TheMealDB `filter.php` and `lookup.php` payloads into typed
//! records, filters the catalog by a search term, and projects a recipe's
//! twenty ingredient slots into display lines.

use serde::Deserialize;
use serde::de::{self, Deserializer, IgnoredAny, MapAccess, Visitor};
use std::fmt;

/// Number of ingredient/measure slots in a TheMealDB recipe.
pub const SLOT_COUNT: usize = 20;

// ============================================================================
// Error type
// ============================================================================

/// Errors that can occur when decoding upstream payloads.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed {payload} payload: {source}")]
    Decode {
        payload: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

// ============================================================================
// Catalog types
// ============================================================================

/// One row of the dessert catalog, copied verbatim from the upstream list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CatalogEntry {
    #[serde(rename = "idMeal")]
    pub id: String,
    #[serde(rename = "strMeal")]
    pub name: String,
    #[serde(rename = "strMealThumb")]
    pub thumbnail_url: String,
}

/// Response envelope shared by both endpoints.
///
/// Upstream answers `{"meals": null}` when nothing matches, so the list is
/// optional, but the key itself must be present.
#[derive(Deserialize)]
#[serde(bound = "T: Deserialize<'de>")]
struct Envelope<T> {
    #[serde(deserialize_with = "Option::deserialize")]
    meals: Option<Vec<T>>,
}

/// Decode a `filter.php` response into catalog entries, preserving order.
pub fn parse_catalog(json: &str) -> Result<Vec<CatalogEntry>, Error> {
    let envelope: Envelope<CatalogEntry> =
        serde_json::from_str(json).map_err(|source| Error::Decode {
            payload: "catalog",
            source,
        })?;
    Ok(envelope.meals.unwrap_or_default())
}

/// Filter catalog entries by a search term.
///
/// An empty query returns every entry. Otherwise an entry is kept when its
/// name contains the query, ignoring case. Relative order is preserved.
pub fn filter_entries<'a>(entries: &'a [CatalogEntry], query: &str) -> Vec<&'a CatalogEntry> {
    if query.is_empty() {
        return entries.iter().collect();
    }
    let needle = query.to_lowercase();
    entries
        .iter()
        .filter(|entry| entry.name.to_lowercase().contains(&needle))
        .collect()
}

// ============================================================================
// Recipe types
// ============================================================================

/// One of the twenty ingredient positions of a recipe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngredientSlot {
    pub ingredient: Option<String>,
    pub measure: Option<String>,
}

/// A displayable ingredient row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngredientLine {
    /// 1-based slot index. Skipped slots leave gaps in the numbering.
    pub position: usize,
    pub ingredient: String,
    pub measure: String,
}

impl fmt::Display for IngredientLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {} {}", self.position, self.measure, self.ingredient)
    }
}

/// The full record returned by `lookup.php`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailRecord {
    pub id: String,
    pub name: String,
    pub thumbnail_url: String,
    pub instructions: Option<String>,
    /// `strArea`, e.g. "Malaysian".
    pub origin: Option<String>,
    pub category: Option<String>,
    /// Raw comma-separated `strTags`.
    pub tags: Option<String>,
    pub video_link: Option<String>,
    pub source_link: Option<String>,
    pub slots: [IngredientSlot; SLOT_COUNT],
}

impl DetailRecord {
    /// Project the ingredient slots into display lines.
    ///
    /// A slot is included only when both its ingredient and its measure are
    /// non-blank. Values are trimmed; positions keep the slot index.
    pub fn ingredient_lines(&self) -> Vec<IngredientLine> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                let ingredient = non_blank(slot.ingredient.as_deref())?;
                let measure = non_blank(slot.measure.as_deref())?;
                Some(IngredientLine {
                    position: index + 1,
                    ingredient: ingredient.to_string(),
                    measure: measure.to_string(),
                })
            })
            .collect()
    }

    /// Individual tags from `strTags`.
    pub fn tags(&self) -> Vec<&str> {
        self.tags
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn origin(&self) -> Option<&str> {
        non_blank(self.origin.as_deref())
    }

    pub fn category(&self) -> Option<&str> {
        non_blank(self.category.as_deref())
    }

    pub fn instructions(&self) -> Option<&str> {
        non_blank(self.instructions.as_deref())
    }

    pub fn video_link(&self) -> Option<&str> {
        non_blank(self.video_link.as_deref())
    }

    pub fn source_link(&self) -> Option<&str> {
        non_blank(self.source_link.as_deref())
    }
}

/// Decode a `lookup.php` response, returning its first record if any.
pub fn parse_detail(json: &str) -> Result<Option<DetailRecord>, Error> {
    let envelope: Envelope<DetailRecord> =
        serde_json::from_str(json).map_err(|source| Error::Decode {
            payload: "recipe",
            source,
        })?;
    Ok(envelope.meals.and_then(|meals| meals.into_iter().next()))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// ============================================================================
// Recipe decoding
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotPart {
    Ingredient,
    Measure,
}

/// Map a numbered slot key such as `strIngredient7` to its part and 0-based
/// index. Returns `None` for other keys and for out-of-range numbers.
fn parse_slot_key(key: &str) -> Option<(SlotPart, usize)> {
    let (part, digits) = if let Some(rest) = key.strip_prefix("strIngredient") {
        (SlotPart::Ingredient, rest)
    } else if let Some(rest) = key.strip_prefix("strMeasure") {
        (SlotPart::Measure, rest)
    } else {
        return None;
    };
    if digits.is_empty() || digits.starts_with('0') || !digits.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    let number: usize = digits.parse().ok()?;
    (1..=SLOT_COUNT)
        .contains(&number)
        .then(|| (part, number - 1))
}

impl<'de> Deserialize<'de> for DetailRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(DetailRecordVisitor)
    }
}

struct DetailRecordVisitor;

impl<'de> Visitor<'de> for DetailRecordVisitor {
    type Value = DetailRecord;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a TheMealDB meal object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<DetailRecord, A::Error> {
        let mut id = None;
        let mut name = None;
        let mut thumbnail_url = None;
        let mut record = DetailRecord::default();

        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "idMeal" => id = Some(map.next_value::<String>()?),
                "strMeal" => name = Some(map.next_value::<String>()?),
                "strMealThumb" => thumbnail_url = Some(map.next_value::<String>()?),
                "strInstructions" => record.instructions = map.next_value()?,
                "strArea" => record.origin = map.next_value()?,
                "strCategory" => record.category = map.next_value()?,
                "strTags" => record.tags = map.next_value()?,
                "strYoutube" => record.video_link = map.next_value()?,
                "strSource" => record.source_link = map.next_value()?,
                other => match parse_slot_key(other) {
                    Some((SlotPart::Ingredient, index)) => {
                        record.slots[index].ingredient = map.next_value()?;
                    }
                    Some((SlotPart::Measure, index)) => {
                        record.slots[index].measure = map.next_value()?;
                    }
                    None => {
                        map.next_value::<IgnoredAny>()?;
                    }
                },
            }
        }

        record.id = id.ok_or_else(|| <A::Error as de::Error>::missing_field("idMeal"))?;
        record.name = name.ok_or_else(|| <A::Error as de::Error>::missing_field("strMeal"))?;
        record.thumbnail_url = thumbnail_url
            .ok_or_else(|| <A::Error as de::Error>::missing_field("strMealThumb"))?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;

    fn entry(id: &str, name: &str) -> CatalogEntry {
        CatalogEntry {
            id: id.to_string(),
            name: name.to_string(),
            thumbnail_url: format!("https://img.example/{id}.jpg"),
        }
    }

    fn sample_catalog() -> Vec<CatalogEntry> {
        vec![
            entry("52893", "Apple & Blackberry Crumble"),
            entry("52768", "Apple Frangipan Tart"),
            entry("52767", "Bakewell tart"),
            entry("53049", "Apam balik"),
            entry("52855", "Banana Pancakes"),
        ]
    }

    fn names(entries: &[&CatalogEntry]) -> Vec<String> {
        entries.iter().map(|e| e.name.clone()).collect()
    }

    fn record_with_slots(slots: &[(usize, Option<&str>, Option<&str>)]) -> DetailRecord {
        let mut record = DetailRecord {
            id: "1".to_string(),
            name: "Test".to_string(),
            ..Default::default()
        };
        for &(position, ingredient, measure) in slots {
            record.slots[position - 1] = IngredientSlot {
                ingredient: ingredient.map(str::to_string),
                measure: measure.map(str::to_string),
            };
        }
        record
    }

    // -- Catalog decoding --

    #[test]
    fn parse_catalog_copies_fields_verbatim() {
        let json = r#"{"meals":[{"idMeal":"52893","strMeal":"Apam balik","strMealThumb":"u1"}]}"#;
        let entries = parse_catalog(json).unwrap();
        assert_eq!(
            entries,
            vec![CatalogEntry {
                id: "52893".to_string(),
                name: "Apam balik".to_string(),
                thumbnail_url: "u1".to_string(),
            }]
        );
    }

    #[test]
    fn parse_catalog_keeps_count_and_order() {
        let json = r#"{"meals":[
            {"idMeal":"3","strMeal":" Padded  ","strMealThumb":"c"},
            {"idMeal":"1","strMeal":"First","strMealThumb":"a"},
            {"idMeal":"2","strMeal":"Second","strMealThumb":"b"}
        ]}"#;
        let entries = parse_catalog(json).unwrap();
        let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["3", "1", "2"]);
        assert_eq!(entries[0].name, " Padded  ");
    }

    #[test]
    fn parse_catalog_null_meals_is_empty() {
        assert!(parse_catalog(r#"{"meals":null}"#).unwrap().is_empty());
    }

    #[test]
    fn parse_catalog_missing_meals_is_an_error() {
        let err = parse_catalog(r#"{"drinks":[]}"#).unwrap_err();
        assert!(matches!(err, Error::Decode { payload: "catalog", .. }));
    }

    #[test]
    fn parse_catalog_rejects_entry_without_name() {
        let err = parse_catalog(r#"{"meals":[{"idMeal":"1","strMealThumb":"x"}]}"#).unwrap_err();
        let message = err.to_string();
        assert!(
            message.starts_with("malformed catalog payload: missing field `strMeal`"),
            "{message}"
        );
    }

    #[test]
    fn parse_catalog_rejects_garbage() {
        assert!(parse_catalog("<html>").is_err());
    }

    // -- Filtering --

    #[test]
    fn filter_empty_query_returns_everything_in_order() {
        let catalog = sample_catalog();
        let all = filter_entries(&catalog, "");
        assert_eq!(all.len(), catalog.len());
        assert!(all.iter().zip(&catalog).all(|(a, b)| *a == b));
    }

    #[test]
    fn filter_is_case_insensitive_and_order_preserving() {
        let catalog = sample_catalog();
        expect![[r#"
            [
                "Apple & Blackberry Crumble",
                "Apple Frangipan Tart",
            ]"#]]
        .assert_eq(&format!("{:#?}", names(&filter_entries(&catalog, "APPLE"))));
        expect![[r#"
            [
                "Apple Frangipan Tart",
                "Bakewell tart",
            ]"#]]
        .assert_eq(&format!("{:#?}", names(&filter_entries(&catalog, "tart"))));
    }

    #[test]
    fn filter_matches_in_the_middle_of_a_name() {
        let catalog = sample_catalog();
        assert_eq!(names(&filter_entries(&catalog, "cake")), ["Banana Pancakes"]);
    }

    #[test]
    fn filter_does_not_trim_the_query() {
        let catalog = sample_catalog();
        assert!(filter_entries(&catalog, " apam").is_empty());
        assert_eq!(filter_entries(&catalog, "m b").len(), 1);
    }

    #[test]
    fn filter_handles_non_ascii_case() {
        let catalog = vec![entry("1", "Crème Brûlée"), entry("2", "Éclair")];
        assert_eq!(names(&filter_entries(&catalog, "BRÛLÉE")), ["Crème Brûlée"]);
        assert_eq!(names(&filter_entries(&catalog, "éc")), ["Éclair"]);
    }

    #[test]
    fn filter_result_is_exactly_the_matching_subsequence() {
        let catalog = sample_catalog();
        for query in ["a", "AP", "ta", "pan", "zzz", "&"] {
            let filtered = filter_entries(&catalog, query);
            let expected: Vec<&CatalogEntry> = catalog
                .iter()
                .filter(|e| e.name.to_lowercase().contains(&query.to_lowercase()))
                .collect();
            assert_eq!(filtered, expected, "query {query:?}");
        }
    }

    #[test]
    fn filter_finds_apam_balik_by_lowercase_prefix() {
        let catalog = parse_catalog(
            r#"{"meals":[{"idMeal":"52893","strMeal":"Apam balik","strMealThumb":"u1"}]}"#,
        )
        .unwrap();
        assert_eq!(names(&filter_entries(&catalog, "")), ["Apam balik"]);
        assert_eq!(names(&filter_entries(&catalog, "apam")), ["Apam balik"]);
        assert!(filter_entries(&catalog, "zzz").is_empty());
    }

    // -- Slot keys --

    #[test]
    fn slot_keys_map_to_fixed_indices() {
        assert_eq!(parse_slot_key("strIngredient1"), Some((SlotPart::Ingredient, 0)));
        assert_eq!(parse_slot_key("strMeasure20"), Some((SlotPart::Measure, 19)));
        assert_eq!(parse_slot_key("strIngredient0"), None);
        assert_eq!(parse_slot_key("strIngredient21"), None);
        assert_eq!(parse_slot_key("strIngredient01"), None);
        assert_eq!(parse_slot_key("strMeasure"), None);
        assert_eq!(parse_slot_key("strMeasure1a"), None);
        assert_eq!(parse_slot_key("strMeal"), None);
    }

    // -- Recipe decoding --

    #[test]
    fn parse_detail_reads_metadata_and_slots() {
        let json = r#"{"meals":[{
            "idMeal":"52893",
            "strMeal":"Apam balik",
            "strDrinkAlternate":null,
            "strCategory":"Dessert",
            "strArea":"Malaysian",
            "strInstructions":"Mix milk, oil and egg together.",
            "strMealThumb":"https://www.themealdb.com/images/media/meals/adxcbq1619787919.jpg",
            "strTags":"Treat, Baking,",
            "strYoutube":"https://www.youtube.com/watch?v=6R8ffRRJcrg",
            "strIngredient1":"Milk",
            "strIngredient2":"Oil",
            "strMeasure1":"200ml",
            "strMeasure2":"60ml",
            "strSource":"https://example.com/apam",
            "dateModified":null
        }]}"#;
        let record = parse_detail(json).unwrap().unwrap();
        assert_eq!(record.id, "52893");
        assert_eq!(record.name, "Apam balik");
        assert_eq!(record.origin(), Some("Malaysian"));
        assert_eq!(record.category(), Some("Dessert"));
        assert_eq!(record.tags(), ["Treat", "Baking"]);
        assert_eq!(
            record.video_link(),
            Some("https://www.youtube.com/watch?v=6R8ffRRJcrg")
        );
        assert_eq!(record.source_link(), Some("https://example.com/apam"));
        assert_eq!(record.slots[1].ingredient.as_deref(), Some("Oil"));
        assert_eq!(record.slots[1].measure.as_deref(), Some("60ml"));
        assert_eq!(record.slots[2], IngredientSlot::default());
    }

    #[test]
    fn parse_detail_empty_or_null_is_absent() {
        assert_eq!(parse_detail(r#"{"meals":[]}"#).unwrap(), None);
        assert_eq!(parse_detail(r#"{"meals":null}"#).unwrap(), None);
    }

    #[test]
    fn parse_detail_takes_the_first_record() {
        let json = r#"{"meals":[
            {"idMeal":"1","strMeal":"One","strMealThumb":"a"},
            {"idMeal":"2","strMeal":"Two","strMealThumb":"b"}
        ]}"#;
        assert_eq!(parse_detail(json).unwrap().unwrap().id, "1");
    }

    #[test]
    fn parse_detail_requires_identity_fields() {
        let err = parse_detail(r#"{"meals":[{"strMeal":"x","strMealThumb":"y"}]}"#).unwrap_err();
        assert!(err.to_string().contains("missing field `idMeal`"), "{err}");
    }

    #[test]
    fn parse_detail_rejects_non_string_slot() {
        let json = r#"{"meals":[{"idMeal":"1","strMeal":"x","strMealThumb":"y","strMeasure3":4}]}"#;
        assert!(parse_detail(json).is_err());
    }

    // -- Ingredient projection --

    #[test]
    fn ingredient_lines_skip_blank_slots_and_keep_positions() {
        let json = r#"{"meals":[{
            "idMeal":"1","strMeal":"x","strMealThumb":"y",
            "strIngredient1":"Milk","strMeasure1":"200ml",
            "strIngredient2":"","strMeasure2":"1 tbs"
        }]}"#;
        let record = parse_detail(json).unwrap().unwrap();
        assert_eq!(
            record.ingredient_lines(),
            vec![IngredientLine {
                position: 1,
                ingredient: "Milk".to_string(),
                measure: "200ml".to_string(),
            }]
        );
    }

    #[test]
    fn ingredient_lines_leave_gaps_in_numbering() {
        let record = record_with_slots(&[
            (1, Some("Flour"), Some("100g")),
            (2, Some("Sugar"), None),
            (3, Some("   "), Some("2")),
            (4, Some(" Eggs "), Some(" 2 ")),
            (20, Some("Salt"), Some("Pinch")),
        ]);
        let rendered: Vec<String> = record
            .ingredient_lines()
            .iter()
            .map(ToString::to_string)
            .collect();
        expect![[r#"
            [
                "1. 100g Flour",
                "4. 2 Eggs",
                "20. Pinch Salt",
            ]"#]]
        .assert_eq(&format!("{:#?}", rendered));
    }

    #[test]
    fn ingredient_lines_are_increasing_non_blank_and_stable() {
        let record = record_with_slots(&[
            (2, Some("Butter"), Some("50g")),
            (5, Some(""), Some("")),
            (7, Some("Cream"), Some("\t")),
            (9, Some("Vanilla"), Some("1 tsp")),
            (15, None, Some("3")),
        ]);
        let lines = record.ingredient_lines();
        assert!(lines.windows(2).all(|w| w[0].position < w[1].position));
        assert!(
            lines
                .iter()
                .all(|l| !l.ingredient.trim().is_empty() && !l.measure.trim().is_empty())
        );
        assert_eq!(lines, record.ingredient_lines());
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn ingredient_lines_of_empty_record_are_empty() {
        assert!(DetailRecord::default().ingredient_lines().is_empty());
    }

    #[test]
    fn blank_optional_fields_read_as_absent() {
        let record = DetailRecord {
            origin: Some("  ".to_string()),
            video_link: Some(String::new()),
            tags: Some(" , ".to_string()),
            ..Default::default()
        };
        assert_eq!(record.origin(), None);
        assert_eq!(record.video_link(), None);
        assert!(record.tags().is_empty());
    }
}
