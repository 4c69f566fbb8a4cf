//! Blocking DaData client: request building, transport and parsing in one call.
//!
//! # Design
//! `DaDataClient` owns a `RequestFactory` and a `Transport`. Every operation
//! builds its request, sends it, and parses the answer; cleansing operations
//! additionally run the input through `batch` so keyed inputs come back keyed.
//! The transport is closed when the client is dropped.

use std::net::IpAddr;

use serde_json::Value;
use tracing::debug;

use crate::batch::{split, CleanInput, CleanOutput, Selector};
use crate::config::{ClientConfig, Credentials};
use crate::error::Result;
use crate::http::{HttpRequest, HttpResponse};
use crate::requests::RequestFactory;
use crate::transport::{Transport, UreqTransport};
use crate::types::{CleanKind, FindKind, SuggestKind, SuggestOptions, Suggestion};

/// Client for the cleansing and suggestion APIs.
///
/// Methods take `&mut self`; use one client per concurrent caller.
#[derive(Debug)]
pub struct DaDataClient<T: Transport = UreqTransport> {
    requests: RequestFactory,
    transport: T,
}

impl DaDataClient<UreqTransport> {
    /// Client against the public hosts with default timeouts.
    pub fn new(credentials: Credentials) -> Self {
        Self::with_config(credentials, ClientConfig::default())
    }

    pub fn with_config(credentials: Credentials, config: ClientConfig) -> Self {
        let transport = UreqTransport::new(&config);
        Self::with_transport(credentials, config, transport)
    }

    /// Credentials and hosts from `DADATA_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self::with_config(Credentials::from_env()?, ClientConfig::from_env()))
    }
}

impl<T: Transport> DaDataClient<T> {
    pub fn with_transport(credentials: Credentials, config: ClientConfig, transport: T) -> Self {
        Self {
            requests: RequestFactory::new(credentials, config),
            transport,
        }
    }

    pub fn requests(&self) -> &RequestFactory {
        &self.requests
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Release the transport's connections now rather than on drop.
    pub fn close(&mut self) {
        self.transport.close();
    }

    fn send(&mut self, request: HttpRequest) -> Result<HttpResponse> {
        self.transport.send(&request)
    }

    /// Raw response records for `values`, one per value, in order.
    pub fn clean_records(&mut self, kind: CleanKind, values: &[Value]) -> Result<Vec<Value>> {
        let request = self.requests.build_clean(kind, values)?;
        let response = self.send(request)?;
        self.requests.parse_clean(&response)
    }

    /// Cleanse `input` and extract one value per record with `selector`.
    ///
    /// A single value yields `CleanOutput::Single`; keyed input yields the
    /// same keys in the same order.
    pub fn clean(&mut self, kind: CleanKind, input: impl Into<CleanInput>, selector: &Selector) -> Result<CleanOutput> {
        let batch = split(input.into());
        debug!(kind = kind.as_str(), records = batch.len(), single = batch.single, "cleaning");
        let records = self.clean_records(kind, &batch.values)?;
        batch.assemble(&records, selector)
    }

    fn clean_with_default(
        &mut self,
        kind: CleanKind,
        input: impl Into<CleanInput>,
        selector: Option<Selector>,
    ) -> Result<CleanOutput> {
        let selector = selector.unwrap_or_else(|| kind.default_selector());
        self.clean(kind, input, &selector)
    }

    /// Full name; defaults to the `result` field.
    pub fn clean_name(&mut self, input: impl Into<CleanInput>, selector: Option<Selector>) -> Result<CleanOutput> {
        self.clean_with_default(CleanKind::Name, input, selector)
    }

    /// Phone number; defaults to the `phone` field.
    pub fn clean_phone(&mut self, input: impl Into<CleanInput>, selector: Option<Selector>) -> Result<CleanOutput> {
        self.clean_with_default(CleanKind::Phone, input, selector)
    }

    /// Passport; defaults to `"{series} {number}"`.
    pub fn clean_passport(&mut self, input: impl Into<CleanInput>, selector: Option<Selector>) -> Result<CleanOutput> {
        self.clean_with_default(CleanKind::Passport, input, selector)
    }

    pub fn clean_email(&mut self, input: impl Into<CleanInput>, selector: Option<Selector>) -> Result<CleanOutput> {
        self.clean_with_default(CleanKind::Email, input, selector)
    }

    pub fn clean_birthdate(&mut self, input: impl Into<CleanInput>, selector: Option<Selector>) -> Result<CleanOutput> {
        self.clean_with_default(CleanKind::Birthdate, input, selector)
    }

    pub fn clean_vehicle(&mut self, input: impl Into<CleanInput>, selector: Option<Selector>) -> Result<CleanOutput> {
        self.clean_with_default(CleanKind::Vehicle, input, selector)
    }

    pub fn clean_address(&mut self, input: impl Into<CleanInput>, selector: Option<Selector>) -> Result<CleanOutput> {
        self.clean_with_default(CleanKind::Address, input, selector)
    }

    /// Composite records: `structure` names the field type of each column
    /// (`"NAME"`, `"PHONE"`, ...), `data` holds the rows. The envelope is
    /// returned as-is.
    pub fn clean_structure(&mut self, structure: &[&str], data: &[Vec<Value>]) -> Result<Value> {
        let request = self.requests.build_clean_structure(structure, data)?;
        let response = self.send(request)?;
        self.requests.parse_raw(&response)
    }

    pub fn suggest(&mut self, kind: SuggestKind, query: &str, options: &SuggestOptions) -> Result<Vec<Suggestion>> {
        let request = self.requests.build_suggest(kind, query, options)?;
        let response = self.send(request)?;
        self.requests.parse_suggestions(&response)
    }

    pub fn find_by_id(&mut self, kind: FindKind, query: &str, options: &SuggestOptions) -> Result<Vec<Suggestion>> {
        let request = self.requests.build_find_by_id(kind, query, options)?;
        let response = self.send(request)?;
        self.requests.parse_suggestions(&response)
    }

    /// Address by FIAS or KLADR code.
    pub fn find_address(&mut self, query: &str, options: &SuggestOptions) -> Result<Vec<Suggestion>> {
        self.find_by_id(FindKind::Address, query, options)
    }

    /// Delivery service city ids by KLADR code.
    pub fn find_delivery(&mut self, query: &str, options: &SuggestOptions) -> Result<Vec<Suggestion>> {
        self.find_by_id(FindKind::Delivery, query, options)
    }

    /// Organization by INN or OGRN.
    pub fn find_party(&mut self, query: &str, options: &SuggestOptions) -> Result<Vec<Suggestion>> {
        self.find_by_id(FindKind::Party, query, options)
    }

    /// City-level address for `ip`, or for the caller's address when `None`.
    /// `Ok(None)` when the API does not know the address.
    pub fn detect_address_by_ip(&mut self, ip: Option<IpAddr>) -> Result<Option<Suggestion>> {
        let request = self.requests.build_detect_address_by_ip(ip);
        let response = self.send(request)?;
        self.requests.parse_location(&response)
    }

    /// Account balance in rubles.
    pub fn balance(&mut self) -> Result<f64> {
        let request = self.requests.build_balance();
        let response = self.send(request)?;
        self.requests.parse_balance(&response)
    }
}

impl<T: Transport> Drop for DaDataClient<T> {
    fn drop(&mut self) {
        self.transport.close();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::rc::Rc;

    use serde_json::json;

    use super::*;
    use crate::error::{Error, UNEXPECTED_ANSWER};
    use crate::http::HttpMethod;

    /// Replays canned responses in order and records what was sent.
    #[derive(Default)]
    struct StubTransport {
        responses: VecDeque<HttpResponse>,
        sent: Rc<RefCell<Vec<HttpRequest>>>,
        closed: Rc<Cell<bool>>,
    }

    impl Transport for StubTransport {
        fn send(&mut self, request: &HttpRequest) -> Result<HttpResponse> {
            self.sent.borrow_mut().push(request.clone());
            self.responses.pop_front().ok_or_else(|| Error::Transport {
                message: "no canned response".to_string(),
            })
        }

        fn close(&mut self) {
            self.closed.set(true);
        }
    }

    fn client(responses: &[(u16, &str)]) -> DaDataClient<StubTransport> {
        let transport = StubTransport {
            responses: responses
                .iter()
                .map(|(status, body)| HttpResponse::new(*status, body.as_bytes()))
                .collect(),
            ..Default::default()
        };
        DaDataClient::with_transport(
            Credentials::new("tok", Some("sec".to_string())),
            ClientConfig::default()
                .with_clean_url("http://clean.local")
                .with_suggestions_url("http://suggest.local"),
            transport,
        )
    }

    fn sent_body(client: &DaDataClient<StubTransport>, index: usize) -> Value {
        let sent = client.transport().sent.borrow();
        serde_json::from_str(sent[index].body.as_deref().unwrap()).unwrap()
    }

    #[test]
    fn clean_name_single_value() {
        let mut c = client(&[(200, r#"[{"source":"срегей владимерович иванов","result":"Иванов Сергей Владимирович"}]"#)]);
        let out = c.clean_name("срегей владимерович иванов", None).unwrap();
        assert_eq!(out, CleanOutput::Single(Some(json!("Иванов Сергей Владимирович"))));
        assert_eq!(sent_body(&c, 0), json!(["срегей владимерович иванов"]));
        assert_eq!(c.transport().sent.borrow()[0].url, "http://clean.local/clean/name");
    }

    #[test]
    fn clean_name_object_input_is_sent_as_records() {
        let mut c = client(&[(200, r#"[{"result":"Иванов"},{"result":"Петров"}]"#)]);
        let out = c.clean_name(json!({"home": "иванов", "work": "петров"}), None).unwrap();
        assert_eq!(
            out,
            CleanOutput::Keyed(vec![
                ("home".to_string(), Some(json!("Иванов"))),
                ("work".to_string(), Some(json!("Петров"))),
            ])
        );
        assert_eq!(sent_body(&c, 0), json!(["иванов", "петров"]));
    }

    #[test]
    fn requests_expose_configured_hosts() {
        let c = client(&[]);
        assert_eq!(c.requests().config().clean_url, "http://clean.local");
        let req = c.requests().build_balance();
        assert_eq!(req.url, "http://clean.local/profile/balance");
        assert!(c.transport().sent.borrow().is_empty());
    }

    #[test]
    fn clean_phone_keyed_values() {
        let mut c = client(&[(200, r#"[{"phone":"+7 916 823-34-54"},{"phone":"+7 495 123-45-67"}]"#)]);
        let input: CleanInput = vec![("mobile", "89168233454"), ("office", "4951234567")].into();
        let out = c.clean_phone(input, None).unwrap();
        assert_eq!(out.get("mobile"), Some(&json!("+7 916 823-34-54")));
        assert_eq!(out.get("office"), Some(&json!("+7 495 123-45-67")));
        assert_eq!(sent_body(&c, 0), json!(["89168233454", "4951234567"]));
    }

    #[test]
    fn clean_passport_default_projection() {
        let mut c = client(&[
            (200, r#"[{"source":"12 345678","series":"12","number":"345678"}]"#),
            (200, r#"[{"source":"12","series":"12"}]"#),
        ]);
        let out = c.clean_passport("12 345678", None).unwrap();
        assert_eq!(out.single(), Some(&json!("12 345678")));

        let out = c.clean_passport("12", None).unwrap();
        assert_eq!(out, CleanOutput::Single(None));
    }

    #[test]
    fn clean_with_custom_selector() {
        let mut c = client(&[(200, r#"[{"result":"г Москва","qc":0}]"#)]);
        let out = c.clean_address("мск", Some(Selector::field("qc"))).unwrap();
        assert_eq!(out.single(), Some(&json!(0)));
    }

    #[test]
    fn clean_record_count_mismatch_is_api_error() {
        let mut c = client(&[(200, r#"[{"email":"a@b.ru"}]"#)]);
        let input: CleanInput = vec![("a", "A@B.RU"), ("b", "c@d.ru")].into();
        let err = c.clean_email(input, None).unwrap_err();
        assert!(matches!(err, Error::Api { status: 200, .. }));
    }

    #[test]
    fn clean_records_returns_raw_response() {
        let mut c = client(&[(200, r#"[{"birthdate":"24.03.1990","qc":0}]"#)]);
        let records = c.clean_records(CleanKind::Birthdate, &[json!("24/3/1990")]).unwrap();
        assert_eq!(records, vec![json!({"birthdate": "24.03.1990", "qc": 0})]);
    }

    #[test]
    fn clean_structure_returns_envelope() {
        let mut c = client(&[(200, r#"{"structure":["NAME"],"data":[[{"result":"Иванов"}]]}"#)]);
        let envelope = c.clean_structure(&["NAME"], &[vec![json!("иванов")]]).unwrap();
        assert_eq!(envelope["data"][0][0]["result"], "Иванов");
        assert_eq!(c.transport().sent.borrow()[0].url, "http://clean.local/clean");
    }

    #[test]
    fn suggest_address_returns_suggestions() {
        let mut c = client(&[(200, r#"{"suggestions":[{"value":"Москва"}]}"#)]);
        let suggestions = c.suggest(SuggestKind::Address, "москва", &SuggestOptions::new()).unwrap();
        assert_eq!(serde_json::to_value(&suggestions).unwrap(), json!([{"value": "Москва"}]));
        assert_eq!(sent_body(&c, 0), json!({"query": "москва"}));
    }

    #[test]
    fn find_party_posts_to_lookup_endpoint() {
        let mut c = client(&[(200, r#"{"suggestions":[{"value":"ПАО СБЕРБАНК","data":{"inn":"7707083893"}}]}"#)]);
        let found = c.find_party("7707083893", &SuggestOptions::new()).unwrap();
        assert_eq!(found[0].data["inn"], "7707083893");
        assert_eq!(c.transport().sent.borrow()[0].url, "http://suggest.local/findById/party");
    }

    #[test]
    fn detect_address_by_ip_without_location_is_api_error() {
        let mut c = client(&[(200, "{}")]);
        let err = c.detect_address_by_ip(None).unwrap_err();
        assert_eq!(err.detail(), Some(UNEXPECTED_ANSWER));
        let sent = c.transport().sent.borrow();
        assert_eq!(sent[0].method, HttpMethod::Get);
        assert!(sent[0].body.is_none());
    }

    #[test]
    fn balance_reads_number() {
        let mut c = client(&[(200, r#"{"balance": 9922.3}"#)]);
        assert_eq!(c.balance().unwrap(), 9922.3);
    }

    #[test]
    fn error_status_propagates_detail() {
        let mut c = client(&[(401, r#"{"detail":"Invalid token"}"#)]);
        let err = c.suggest(SuggestKind::Fio, "Викт", &SuggestOptions::new()).unwrap_err();
        assert!(matches!(err, Error::Api { status: 401, .. }));
        assert!(err.to_string().contains("Invalid token"));
    }

    #[test]
    fn transport_failure_propagates() {
        let mut c = client(&[]);
        assert!(matches!(c.balance().unwrap_err(), Error::Transport { .. }));
    }

    #[test]
    fn drop_closes_transport() {
        let c = client(&[]);
        let closed = Rc::clone(&c.transport().closed);
        assert!(!closed.get());
        drop(c);
        assert!(closed.get());
    }

    #[test]
    fn drop_closes_transport_after_error() {
        let closed = {
            let mut c = client(&[(500, "oops")]);
            let closed = Rc::clone(&c.transport().closed);
            assert!(c.balance().is_err());
            closed
        };
        assert!(closed.get());
    }
}
