use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One company's listing exactly as the endpoint returned it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExhibitorRecord(pub Map<String, Value>);

impl ExhibitorRecord {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

/// How a source value lands in the localized sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    /// Copied as-is; absent stays absent.
    Raw,
    /// Falsy values become "".
    OptionalText,
    /// Truthy -> "Y", otherwise "N".
    Flag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Order,
    CompanyId,
    Name,
    Subtitle,
    Address,
    Town,
    County,
    Country,
    Area,
    Postcode,
    Pavilion,
    Stand,
    Fax,
    Telephone,
    Email,
    Web,
    Facebook,
    Twitter,
    LinkedIn,
    Instagram,
    Youtube,
    Description,
    SubIndustry,
    Sectors,
    NumberOfProducts,
    NumberOfActivities,
    NumberOfNews,
    HasLogo,
    HasAgenda,
    Favourite,
}

impl Field {
    /// Column order of the localized sheet.
    pub const ALL: [Field; 30] = [
        Field::Order,
        Field::CompanyId,
        Field::Name,
        Field::Subtitle,
        Field::Address,
        Field::Town,
        Field::County,
        Field::Country,
        Field::Area,
        Field::Postcode,
        Field::Pavilion,
        Field::Stand,
        Field::Fax,
        Field::Telephone,
        Field::Email,
        Field::Web,
        Field::Facebook,
        Field::Twitter,
        Field::LinkedIn,
        Field::Instagram,
        Field::Youtube,
        Field::Description,
        Field::SubIndustry,
        Field::Sectors,
        Field::NumberOfProducts,
        Field::NumberOfActivities,
        Field::NumberOfNews,
        Field::HasLogo,
        Field::HasAgenda,
        Field::Favourite,
    ];

    /// Key used by the listing endpoint.
    pub fn source_key(self) -> &'static str {
        match self {
            Field::Order => "corder",
            Field::CompanyId => "IdAccount",
            Field::Name => "Name",
            Field::Subtitle => "Subtitle",
            Field::Address => "Address1",
            Field::Town => "Town",
            Field::County => "County",
            Field::Country => "Country",
            Field::Area => "Area",
            Field::Postcode => "Postcode",
            Field::Pavilion => "Pavilion",
            Field::Stand => "Stand",
            Field::Fax => "Fax",
            Field::Telephone => "Telephone",
            Field::Email => "Email",
            Field::Web => "Web",
            Field::Facebook => "Facebook",
            Field::Twitter => "Twitter",
            Field::LinkedIn => "LinkedIn",
            Field::Instagram => "Instagram",
            Field::Youtube => "Youtube",
            Field::Description => "Description",
            Field::SubIndustry => "SubIndustry",
            Field::Sectors => "Sectors",
            Field::NumberOfProducts => "NumberOfProducts",
            Field::NumberOfActivities => "NumberOfActivities",
            Field::NumberOfNews => "NumberOfNews",
            Field::HasLogo => "HasLogo",
            Field::HasAgenda => "HasAgenda",
            Field::Favourite => "Favourite",
        }
    }

    /// Localized header in the collected spreadsheet.
    pub fn label(self) -> &'static str {
        match self {
            Field::Order => "순번",
            Field::CompanyId => "회사ID",
            Field::Name => "회사명",
            Field::Subtitle => "부제목",
            Field::Address => "주소",
            Field::Town => "도시",
            Field::County => "지역",
            Field::Country => "국가",
            Field::Area => "구역",
            Field::Postcode => "우편번호",
            Field::Pavilion => "전시관",
            Field::Stand => "부스번호",
            Field::Fax => "팩스",
            Field::Telephone => "전화번호",
            Field::Email => "이메일",
            Field::Web => "웹사이트",
            Field::Facebook => "페이스북",
            Field::Twitter => "트위터",
            Field::LinkedIn => "링크드인",
            Field::Instagram => "인스타그램",
            Field::Youtube => "유튜브",
            Field::Description => "설명",
            Field::SubIndustry => "하위업종",
            Field::Sectors => "업종",
            Field::NumberOfProducts => "제품수",
            Field::NumberOfActivities => "활동수",
            Field::NumberOfNews => "뉴스수",
            Field::HasLogo => "로고보유",
            Field::HasAgenda => "일정보유",
            Field::Favourite => "즐겨찾기",
        }
    }

    pub fn from_label(label: &str) -> Option<Field> {
        let label = label.trim();
        Field::ALL.into_iter().find(|f| f.label() == label)
    }

    fn kind(self) -> Kind {
        match self {
            Field::Order
            | Field::CompanyId
            | Field::Name
            | Field::Address
            | Field::Town
            | Field::County
            | Field::Country
            | Field::Postcode
            | Field::Stand
            | Field::NumberOfProducts
            | Field::NumberOfActivities
            | Field::NumberOfNews => Kind::Raw,
            Field::HasLogo | Field::HasAgenda | Field::Favourite => Kind::Flag,
            _ => Kind::OptionalText,
        }
    }
}

/// A record projected onto the known fields, as it appears in the localized sheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalizedRecord {
    values: BTreeMap<Field, Value>,
}

impl LocalizedRecord {
    pub fn from_raw(raw: &ExhibitorRecord) -> Self {
        let mut values = BTreeMap::new();
        for field in Field::ALL {
            let value = raw.get(field.source_key());
            let localized = match field.kind() {
                Kind::Raw => match value {
                    Some(v) => v.clone(),
                    None => continue,
                },
                Kind::OptionalText => match value {
                    Some(v) if is_truthy(v) => v.clone(),
                    _ => Value::String(String::new()),
                },
                Kind::Flag => {
                    let flag = if value.is_some_and(is_truthy) { "Y" } else { "N" };
                    Value::String(flag.to_string())
                }
            };
            values.insert(field, localized);
        }
        LocalizedRecord { values }
    }

    pub fn get(&self, field: Field) -> Option<&Value> {
        self.values.get(&field)
    }

    /// String content of `field`, or "" for missing and non-string values.
    pub fn text(&self, field: Field) -> &str {
        self.get(field).and_then(Value::as_str).unwrap_or("")
    }
}

impl FromIterator<(Field, Value)> for LocalizedRecord {
    fn from_iter<I: IntoIterator<Item = (Field, Value)>>(iter: I) -> Self {
        LocalizedRecord {
            values: iter.into_iter().collect(),
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(v: Value) -> ExhibitorRecord {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn labels_are_unique() {
        for (i, a) in Field::ALL.iter().enumerate() {
            for b in &Field::ALL[i + 1..] {
                assert_ne!(a.label(), b.label());
            }
        }
    }

    #[test]
    fn label_lookup_trims() {
        assert_eq!(Field::from_label(" 회사명 "), Some(Field::Name));
        assert_eq!(Field::from_label("Company"), None);
    }

    #[test]
    fn localizes_by_kind() {
        let r = LocalizedRecord::from_raw(&raw(json!({
            "Name": "Acme",
            "Stand": "4B",
            "Fax": null,
            "Web": "",
            "HasLogo": true,
            "HasAgenda": false,
            "NumberOfProducts": 3,
        })));

        assert_eq!(r.get(Field::Name), Some(&json!("Acme")));
        assert_eq!(r.get(Field::NumberOfProducts), Some(&json!(3)));
        // raw fields absent from the source stay absent
        assert_eq!(r.get(Field::Country), None);
        assert_eq!(r.text(Field::Fax), "");
        assert_eq!(r.text(Field::Web), "");
        assert_eq!(r.text(Field::Email), "");
        assert_eq!(r.text(Field::HasLogo), "Y");
        assert_eq!(r.text(Field::HasAgenda), "N");
        assert_eq!(r.text(Field::Favourite), "N");
    }

    #[test]
    fn raw_record_serializes_verbatim() {
        let v = json!({"Name": "Acme", "corder": 1, "HasLogo": false});
        let r = raw(v.clone());
        assert_eq!(serde_json::to_value(&r).unwrap(), v);
    }
}
