use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::info;

/// Token the stub accepts in `Authorization: Token <token>`.
pub const TOKEN: &str = "test-token";
/// Secret the stub requires on cleansing and profile calls.
pub const SECRET: &str = "test-secret";
pub const BALANCE: f64 = 9922.30;
/// IP address the stub can geolocate; any other address is unknown.
pub const KNOWN_IP: &str = "46.226.227.20";

type Failure = (StatusCode, Json<Value>);
type Reply = Result<Json<Value>, Failure>;

/// Canned candidates per suggestion kind.
pub struct Catalog {
    fio: Vec<Value>,
    address: Vec<Value>,
    party: Vec<Value>,
    bank: Vec<Value>,
    delivery: Vec<Value>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            fio: ["Виктор", "Виктория", "Викторов Иван Петрович", "Иванов Сергей Владимирович"]
                .iter()
                .map(|v| json!({ "value": v, "unrestricted_value": v, "data": {} }))
                .collect(),
            address: vec![
                json!({"value": "г Москва", "unrestricted_value": "г Москва",
                       "data": {"city": "Москва", "fias_id": "0c5b2444-70a0-4932-980c-b4dc0d3f02b5", "kladr_id": "7700000000000"}}),
                json!({"value": "г Москва, ул Тверская", "unrestricted_value": "125009, г Москва, ул Тверская",
                       "data": {"city": "Москва", "street": "Тверская", "fias_id": "f26b876b-6857-4951-b060-ec6559f04a9a", "kladr_id": "77000000000287700"}}),
                json!({"value": "г Санкт-Петербург, Невский пр-кт", "unrestricted_value": "г Санкт-Петербург, Невский пр-кт",
                       "data": {"city": "Санкт-Петербург", "fias_id": "c2deb16a-0330-4f05-821f-1d09c93331e6", "kladr_id": "7800000000000"}}),
            ],
            party: vec![
                json!({"value": "ПАО СБЕРБАНК", "unrestricted_value": "ПАО СБЕРБАНК",
                       "data": {"inn": "7707083893", "ogrn": "1027700132195", "kpp": "773601001"}}),
                json!({"value": "ООО \"ЯНДЕКС\"", "unrestricted_value": "ООО \"ЯНДЕКС\"",
                       "data": {"inn": "7736207543", "ogrn": "1027700229193", "kpp": "770401001"}}),
            ],
            bank: vec![
                json!({"value": "ПАО Сбербанк", "unrestricted_value": "ПАО Сбербанк", "data": {"bic": "044525225"}}),
                json!({"value": "АО \"Тинькофф Банк\"", "unrestricted_value": "АО \"Тинькофф Банк\"", "data": {"bic": "044525974"}}),
            ],
            delivery: vec![
                json!({"value": "7700000000000", "unrestricted_value": "fe7eea4a-875a-4235-aa61-81c2a37a0440",
                       "data": {"kladr_id": "7700000000000", "cdek_id": "44", "boxberry_id": "68", "dpd_id": "49694102"}}),
            ],
        }
    }
}

pub fn app() -> Router {
    let catalog = Arc::new(Catalog::default());
    Router::new()
        .route("/clean", post(clean_structure))
        .route("/clean/{kind}", post(clean))
        .route("/suggest/{kind}", post(suggest))
        .route("/findById/{kind}", post(find_by_id))
        .route("/detectAddressByIp", get(detect_address_by_ip))
        .route("/profile/balance", get(balance))
        .with_state(catalog)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn failure(status: StatusCode, detail: &str) -> Failure {
    (status, Json(json!({ "detail": detail })))
}

/// Token is always required; the secret only when `needs_secret`.
fn authorize(headers: &HeaderMap, needs_secret: bool) -> Result<(), Failure> {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Token "));
    if token != Some(TOKEN) {
        return Err(failure(StatusCode::UNAUTHORIZED, "Invalid API key"));
    }
    if needs_secret && headers.get("x-secret").and_then(|v| v.to_str().ok()) != Some(SECRET) {
        return Err(failure(StatusCode::FORBIDDEN, "Invalid secret key"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Cleansing
// ---------------------------------------------------------------------------

async fn clean(headers: HeaderMap, Path(kind): Path<String>, Json(values): Json<Vec<Value>>) -> Reply {
    authorize(&headers, true)?;
    info!(kind = %kind, records = values.len(), "clean");
    let records = values
        .iter()
        .map(|v| clean_record(&kind, v))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "Unknown cleansing type"))?;
    Ok(Json(Value::Array(records)))
}

#[derive(Deserialize)]
struct StructureRequest {
    structure: Vec<String>,
    data: Vec<Vec<Value>>,
}

async fn clean_structure(headers: HeaderMap, Json(input): Json<StructureRequest>) -> Reply {
    authorize(&headers, true)?;
    info!(columns = input.structure.len(), rows = input.data.len(), "clean structure");
    let mut rows = Vec::with_capacity(input.data.len());
    for row in &input.data {
        if row.len() != input.structure.len() {
            return Err(failure(StatusCode::BAD_REQUEST, "Row length does not match structure"));
        }
        let cleaned = input
            .structure
            .iter()
            .zip(row)
            .map(|(column, value)| match column.as_str() {
                "AS_IS" => Some(json!({ "source": source_text(value) })),
                other => clean_record(&other.to_lowercase(), value),
            })
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| failure(StatusCode::BAD_REQUEST, "Unknown structure type"))?;
        rows.push(Value::Array(cleaned));
    }
    Ok(Json(json!({ "structure": input.structure, "data": rows })))
}

/// One cleaned record, or `None` for an unknown kind.
fn clean_record(kind: &str, value: &Value) -> Option<Value> {
    let source = source_text(value);
    let record = match kind {
        "name" => json!({ "source": source, "result": title_case(&source), "qc": 0 }),
        "phone" => match normalize_phone(&source) {
            Some(phone) => json!({ "source": source, "phone": phone, "qc": 0 }),
            None => json!({ "source": source, "phone": null, "qc": 1 }),
        },
        "passport" => match split_passport(&source) {
            Some((series, number)) => json!({ "source": source, "series": series, "number": number, "qc": 0 }),
            None => json!({ "source": source, "qc": 1 }),
        },
        "email" => {
            let email = source.trim().to_lowercase();
            if email.contains('@') {
                json!({ "source": source, "email": email, "qc": 0 })
            } else {
                json!({ "source": source, "email": null, "qc": 1 })
            }
        }
        "birthdate" => match normalize_date(&source) {
            Some(date) => json!({ "source": source, "birthdate": date, "qc": 0 }),
            None => json!({ "source": source, "birthdate": null, "qc": 1 }),
        },
        "address" | "vehicle" => json!({ "source": source, "result": collapse_whitespace(&source), "qc": 0 }),
        _ => return None,
    };
    Some(record)
}

fn source_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn digits(s: &str) -> String {
    s.chars().filter(char::is_ascii_digit).collect()
}

/// `+7 XXX XXX-XX-XX` for Russian numbers with or without the trunk prefix.
fn normalize_phone(s: &str) -> Option<String> {
    let digits = digits(s);
    let national = match digits.len() {
        10 => digits.as_str(),
        11 if digits.starts_with('7') || digits.starts_with('8') => &digits[1..],
        _ => return None,
    };
    Some(format!(
        "+7 {} {}-{}-{}",
        &national[..3],
        &national[3..6],
        &national[6..8],
        &national[8..]
    ))
}

fn split_passport(s: &str) -> Option<(String, String)> {
    let parts: Vec<&str> = s.split_whitespace().collect();
    if let [series, number] = parts.as_slice() {
        if series.chars().all(|c| c.is_ascii_digit()) && number.chars().all(|c| c.is_ascii_digit()) {
            return Some((series.to_string(), number.to_string()));
        }
    }
    let digits = digits(s);
    if digits.len() == 10 {
        return Some((format!("{} {}", &digits[..2], &digits[2..4]), digits[4..].to_string()));
    }
    None
}

/// Accepts `d.m.yyyy`, `d/m/yyyy` and `yyyy-mm-dd`; answers `dd.mm.yyyy`.
fn normalize_date(s: &str) -> Option<String> {
    let parts: Vec<u32> = s
        .trim()
        .split(['.', '/', '-'])
        .map(|p| p.parse().ok())
        .collect::<Option<Vec<_>>>()?;
    let (day, month, year) = match parts.as_slice() {
        [y, m, d] if *y > 31 => (*d, *m, *y),
        [d, m, y] => (*d, *m, *y),
        _ => return None,
    };
    if !(1..=31).contains(&day) || !(1..=12).contains(&month) || year < 1000 {
        return None;
    }
    Some(format!("{day:02}.{month:02}.{year}"))
}

// ---------------------------------------------------------------------------
// Suggestions
// ---------------------------------------------------------------------------

const EMAIL_DOMAINS: [&str; 4] = ["gmail.com", "mail.ru", "yandex.ru", "rambler.ru"];
const DEFAULT_COUNT: usize = 10;
const MAX_COUNT: usize = 20;

fn query_of(body: &Value) -> Result<String, Failure> {
    body.get("query")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| failure(StatusCode::BAD_REQUEST, "query is required"))
}

fn count_of(body: &Value) -> usize {
    body.get("count")
        .and_then(Value::as_u64)
        .map_or(DEFAULT_COUNT, |c| (c as usize).min(MAX_COUNT))
}

async fn suggest(
    State(catalog): State<Arc<Catalog>>,
    headers: HeaderMap,
    Path(kind): Path<String>,
    Json(body): Json<Value>,
) -> Reply {
    authorize(&headers, false)?;
    let query = query_of(&body)?;
    let count = count_of(&body);
    info!(kind = %kind, query = %query, count, "suggest");

    let suggestions: Vec<Value> = if kind == "email" {
        suggest_email(&query)
    } else {
        let candidates = match kind.as_str() {
            "fio" => &catalog.fio,
            "address" => &catalog.address,
            "party" => &catalog.party,
            "bank" => &catalog.bank,
            _ => return Err(failure(StatusCode::NOT_FOUND, "Unknown suggestion type")),
        };
        let needle = query.to_lowercase();
        if needle.trim().is_empty() {
            Vec::new()
        } else {
            candidates
                .iter()
                .filter(|c| {
                    c["value"]
                        .as_str()
                        .is_some_and(|v| v.to_lowercase().contains(&needle))
                })
                .cloned()
                .collect()
        }
    };
    let suggestions: Vec<Value> = suggestions.into_iter().take(count).collect();
    Ok(Json(json!({ "suggestions": suggestions })))
}

fn suggest_email(query: &str) -> Vec<Value> {
    let (local, domain) = query.split_once('@').unwrap_or((query, ""));
    if local.is_empty() {
        return Vec::new();
    }
    EMAIL_DOMAINS
        .iter()
        .filter(|d| d.starts_with(domain))
        .map(|d| {
            let value = format!("{local}@{d}");
            json!({ "value": value, "unrestricted_value": value, "data": { "local": local, "domain": d } })
        })
        .collect()
}

async fn find_by_id(
    State(catalog): State<Arc<Catalog>>,
    headers: HeaderMap,
    Path(kind): Path<String>,
    Json(body): Json<Value>,
) -> Reply {
    authorize(&headers, false)?;
    let query = query_of(&body)?;
    info!(kind = %kind, query = %query, "find by id");

    let (candidates, id_fields): (&[Value], &[&str]) = match kind.as_str() {
        "party" => (catalog.party.as_slice(), &["inn", "ogrn"][..]),
        "address" => (catalog.address.as_slice(), &["fias_id", "kladr_id"][..]),
        "delivery" => (catalog.delivery.as_slice(), &["kladr_id"][..]),
        _ => return Err(failure(StatusCode::NOT_FOUND, "Unknown lookup type")),
    };
    let found: Vec<Value> = candidates
        .iter()
        .filter(|c| id_fields.iter().any(|f| c["data"][*f].as_str() == Some(query.as_str())))
        .take(count_of(&body))
        .cloned()
        .collect();
    Ok(Json(json!({ "suggestions": found })))
}

#[derive(Deserialize)]
struct IpQuery {
    ip: Option<String>,
}

async fn detect_address_by_ip(headers: HeaderMap, Query(params): Query<IpQuery>) -> Reply {
    authorize(&headers, false)?;
    info!(ip = ?params.ip, "detect address by ip");
    let Some(ip) = params.ip else {
        // The caller is on loopback; nothing to locate.
        return Ok(Json(json!({ "location": null })));
    };
    if ip.parse::<std::net::IpAddr>().is_err() {
        return Err(failure(StatusCode::BAD_REQUEST, "Invalid IP address"));
    }
    if ip == KNOWN_IP {
        return Ok(Json(json!({
            "location": {
                "value": "г Москва",
                "unrestricted_value": "101000, г Москва",
                "data": { "city": "Москва", "country": "Россия", "kladr_id": "7700000000000" }
            }
        })));
    }
    Ok(Json(json!({ "location": null })))
}

async fn balance(headers: HeaderMap) -> Reply {
    authorize(&headers, true)?;
    info!("balance");
    Ok(Json(json!({ "balance": BALANCE })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_case_handles_cyrillic() {
        assert_eq!(title_case("срегей  ИВАНОВ"), "Срегей Иванов");
    }

    #[test]
    fn phone_normalization() {
        assert_eq!(normalize_phone("8 916 823-34-54").as_deref(), Some("+7 916 823-34-54"));
        assert_eq!(normalize_phone("(495) 123 45 67").as_deref(), Some("+7 495 123-45-67"));
        assert_eq!(normalize_phone("12345"), None);
    }

    #[test]
    fn passport_split() {
        assert_eq!(split_passport("12 345678"), Some(("12".to_string(), "345678".to_string())));
        assert_eq!(split_passport("4509235857"), Some(("45 09".to_string(), "235857".to_string())));
        assert_eq!(split_passport("12"), None);
    }

    #[test]
    fn date_normalization() {
        assert_eq!(normalize_date("24/3/1990").as_deref(), Some("24.03.1990"));
        assert_eq!(normalize_date("1990-03-24").as_deref(), Some("24.03.1990"));
        assert_eq!(normalize_date("32.13.1990"), None);
        assert_eq!(normalize_date("вчера"), None);
    }

    #[test]
    fn unknown_clean_kind_is_rejected() {
        assert!(clean_record("horoscope", &json!("овен")).is_none());
    }

    #[test]
    fn non_string_source_is_rendered() {
        let record = clean_record("phone", &json!(89168233454u64)).unwrap();
        assert_eq!(record["source"], "89168233454");
        assert_eq!(record["phone"], "+7 916 823-34-54");
    }

    #[test]
    fn email_suggestions_complete_domain() {
        let values: Vec<String> = suggest_email("ivan@ya")
            .iter()
            .map(|s| s["value"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(values, vec!["ivan@yandex.ru"]);
        assert!(suggest_email("@mail").is_empty());
    }
}
