//! Kiwoom REST client: daily price series (`ka10086`) and stock basic
//! information (`ka10001`).

use async_trait::async_trait;
use ats_core::error::SourceError;
use ats_core::traits::MarketDataSource;
use ats_core::types::{Credential, DailyPage, Page, RawDailyItem, RawFundamentalItem};
use chrono::NaiveDate;
use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    build_client, classify_failure, header_value, lenient_string, map_transport_error,
    response_header, HttpSettings, RateLimitSignatures,
};
use crate::normalize::format_date;

const PROVIDER: &str = "Kiwoom";
const DAILY_PRICE_PATH: &str = "/api/dostk/mrkcond";
const DAILY_PRICE_API_ID: &str = "ka10086";
const STOCK_INFO_PATH: &str = "/api/dostk/stkinfo";
const STOCK_INFO_API_ID: &str = "ka10001";

/// Kiwoom client configuration.
#[derive(Debug, Clone)]
pub struct KiwoomConfig {
    pub base_url: String,
    pub http: HttpSettings,
    pub rate_limit_signatures: RateLimitSignatures,
}

impl Default for KiwoomConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.kiwoom.com".to_string(),
            http: HttpSettings::default(),
            rate_limit_signatures: RateLimitSignatures::default(),
        }
    }
}

/// Result fields every Kiwoom response carries next to its payload.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default, deserialize_with = "lenient_string")]
    return_code: Option<String>,
    #[serde(default)]
    return_msg: Option<String>,
    #[serde(flatten)]
    body: T,
}

/// Body text plus the continuation headers of one response.
struct RawPage {
    body: String,
    cont_yn: Option<String>,
    next_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct DailyPriceRequest<'a> {
    stk_cd: &'a str,
    qry_dt: String,
    /// 0 = quantities, 1 = amounts
    indc_tp: &'static str,
}

#[derive(Debug, Deserialize)]
struct DailyPriceBody {
    #[serde(default)]
    daly_stkpc: Vec<KiwoomDailyItem>,
}

#[derive(Debug, Deserialize)]
struct KiwoomDailyItem {
    date: String,
    #[serde(default, deserialize_with = "lenient_string")]
    open_pric: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    high_pric: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    low_pric: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    close_pric: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    trde_qty: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    amt_mn: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    flu_rt: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    ind: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    orgn: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    for_qty: Option<String>,
}

impl From<KiwoomDailyItem> for RawDailyItem {
    fn from(item: KiwoomDailyItem) -> Self {
        Self {
            date: item.date,
            open: item.open_pric,
            high: item.high_pric,
            low: item.low_pric,
            close: item.close_pric,
            volume: item.trde_qty,
            turnover: item.amt_mn,
            change_rate: item.flu_rt,
            individual_net: item.ind,
            institution_net: item.orgn,
            foreign_net: item.for_qty,
        }
    }
}

#[derive(Debug, Serialize)]
struct StockInfoRequest<'a> {
    stk_cd: &'a str,
}

/// Basic information is one flat object per page.
#[derive(Debug, Deserialize)]
struct StockInfoBody {
    #[serde(default, deserialize_with = "lenient_string")]
    mac: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    trde_qty: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    per: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pbr: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    eps: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    bps: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    roe: Option<String>,
}

impl From<StockInfoBody> for RawFundamentalItem {
    fn from(body: StockInfoBody) -> Self {
        Self {
            market_cap: body.mac,
            volume: body.trde_qty,
            per: body.per,
            pbr: body.pbr,
            eps: body.eps,
            bps: body.bps,
            roe: body.roe,
        }
    }
}

/// Kiwoom market data client.
pub struct KiwoomSource {
    config: KiwoomConfig,
    client: Client,
}

impl KiwoomSource {
    /// Create a new client.
    pub fn new(config: KiwoomConfig) -> Result<Self, SourceError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json;charset=UTF-8"),
        );
        let client = build_client(&config.http, headers)?;
        Ok(Self { config, client })
    }

    /// POST one request, forwarding the continuation key when given.
    async fn post<B: Serialize>(
        &self,
        credential: &Credential,
        path: &str,
        api_id: &'static str,
        request: &B,
        continuation: Option<&str>,
    ) -> Result<RawPage, SourceError> {
        let url = format!("{}{}", self.config.base_url, path);

        let mut builder = self
            .client
            .post(&url)
            .header(
                header::AUTHORIZATION,
                header_value("authorization", &format!("Bearer {}", credential.expose()))?,
            )
            .header("api-id", api_id)
            .json(request);

        if let Some(key) = continuation {
            builder = builder
                .header("cont-yn", "Y")
                .header("next-key", header_value("next-key", key)?);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| map_transport_error(PROVIDER, e))?;

        let status = resp.status();
        let cont_yn = response_header(resp.headers(), "cont-yn");
        let next_key = response_header(resp.headers(), "next-key");
        let body = resp
            .text()
            .await
            .map_err(|e| map_transport_error(PROVIDER, e))?;

        if !status.is_success() {
            return Err(classify_failure(
                PROVIDER,
                status,
                &body,
                &self.config.rate_limit_signatures,
            ));
        }

        Ok(RawPage {
            body,
            cont_yn,
            next_key,
        })
    }

    /// Decode a successful body, honouring `return_code`.
    fn decode<T: DeserializeOwned>(
        body: &str,
        signatures: &RateLimitSignatures,
    ) -> Result<T, SourceError> {
        let envelope: Envelope<T> =
            serde_json::from_str(body).map_err(|e| SourceError::Parse(e.to_string()))?;

        match envelope.return_code.as_deref() {
            None | Some("0") => Ok(envelope.body),
            Some(code) => {
                let message = format!(
                    "return_code {}: {}",
                    code,
                    envelope.return_msg.unwrap_or_default()
                );
                Err(classify_failure(
                    PROVIDER,
                    reqwest::StatusCode::OK,
                    &format!("{} {}", message, body),
                    signatures,
                ))
            }
        }
    }

    fn has_more(cont_yn: Option<&str>) -> bool {
        cont_yn.is_some_and(|v| v.eq_ignore_ascii_case("Y"))
    }

    /// Decode one daily series page.
    fn parse_page(
        body: &str,
        cont_yn: Option<&str>,
        next_key: Option<String>,
        signatures: &RateLimitSignatures,
    ) -> Result<DailyPage, SourceError> {
        let decoded: DailyPriceBody = Self::decode(body, signatures)?;
        Ok(DailyPage {
            items: decoded.daly_stkpc.into_iter().map(RawDailyItem::from).collect(),
            has_more: Self::has_more(cont_yn),
            next_key,
        })
    }

    /// Decode one basic information page. A body with no figures yields no item.
    fn parse_fundamental_page(
        body: &str,
        cont_yn: Option<&str>,
        next_key: Option<String>,
        signatures: &RateLimitSignatures,
    ) -> Result<Page<RawFundamentalItem>, SourceError> {
        let decoded: StockInfoBody = Self::decode(body, signatures)?;
        let item = RawFundamentalItem::from(decoded);
        Ok(Page {
            items: if item.is_blank() { Vec::new() } else { vec![item] },
            has_more: Self::has_more(cont_yn),
            next_key,
        })
    }
}

#[async_trait]
impl MarketDataSource for KiwoomSource {
    async fn fetch_daily_series(
        &self,
        credential: &Credential,
        instrument: &str,
        date: NaiveDate,
        continuation: Option<&str>,
    ) -> Result<DailyPage, SourceError> {
        let request = DailyPriceRequest {
            stk_cd: instrument,
            qry_dt: format_date(date),
            indc_tp: "0",
        };

        debug!(instrument = %instrument, continuation = ?continuation, "Requesting daily page");

        let raw = self
            .post(credential, DAILY_PRICE_PATH, DAILY_PRICE_API_ID, &request, continuation)
            .await?;
        Self::parse_page(
            &raw.body,
            raw.cont_yn.as_deref(),
            raw.next_key,
            &self.config.rate_limit_signatures,
        )
    }

    async fn fetch_fundamentals(
        &self,
        credential: &Credential,
        instrument: &str,
        continuation: Option<&str>,
    ) -> Result<Page<RawFundamentalItem>, SourceError> {
        let request = StockInfoRequest { stk_cd: instrument };

        debug!(instrument = %instrument, continuation = ?continuation, "Requesting basic information");

        let raw = self
            .post(credential, STOCK_INFO_PATH, STOCK_INFO_API_ID, &request, continuation)
            .await?;
        Self::parse_fundamental_page(
            &raw.body,
            raw.cont_yn.as_deref(),
            raw.next_key,
            &self.config.rate_limit_signatures,
        )
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"{
        "daly_stkpc": [
            {"date": "20240305", "open_pric": "+70400", "high_pric": "+71000", "low_pric": "-69900",
             "close_pric": "-70100", "trde_qty": "11234567", "amt_mn": "788123", "flu_rt": "-0.57",
             "ind": "+153021", "orgn": "-98200", "for_qty": "-54821"},
            {"date": "20240304", "open_pric": "70000", "close_pric": "+70500", "trde_qty": 9876543}
        ],
        "return_code": 0,
        "return_msg": "정상적으로 처리되었습니다"
    }"#;

    fn signatures() -> RateLimitSignatures {
        RateLimitSignatures::new(["허용된 요청 개수를 초과"])
    }

    #[test]
    fn test_parse_page_with_continuation() {
        let page =
            KiwoomSource::parse_page(PAGE, Some("Y"), Some("20240301".into()), &signatures())
                .unwrap();

        assert_eq!(page.items.len(), 2);
        assert_eq!(page.continuation(), Some("20240301"));

        let first = &page.items[0];
        assert_eq!(first.close.as_deref(), Some("-70100"));
        assert_eq!(first.individual_net.as_deref(), Some("+153021"));
        assert_eq!(first.foreign_net.as_deref(), Some("-54821"));
        // numeric JSON values are kept as text
        assert_eq!(page.items[1].volume.as_deref(), Some("9876543"));
        assert!(page.items[1].individual_net.is_none());
    }

    #[test]
    fn test_last_page() {
        let page = KiwoomSource::parse_page(PAGE, Some("N"), None, &signatures()).unwrap();
        assert!(!page.has_more);
        assert_eq!(page.continuation(), None);
    }

    #[test]
    fn test_error_return_code() {
        let limited = r#"{"return_code": 5, "return_msg": "허용된 요청 개수를 초과하였습니다"}"#;
        let err = KiwoomSource::parse_page(limited, None, None, &signatures()).unwrap_err();
        assert!(err.is_rate_limited());

        let invalid = r#"{"return_code": 2, "return_msg": "종목코드가 올바르지 않습니다"}"#;
        let err = KiwoomSource::parse_page(invalid, None, None, &signatures()).unwrap_err();
        assert!(matches!(err, SourceError::Provider { .. }));
    }

    #[test]
    fn test_parse_fundamental_page() {
        let body = r#"{
            "stk_cd": "005930", "stk_nm": "삼성전자", "mac": "4310000", "trde_qty": "11234567",
            "per": "33.87", "pbr": "1.39", "eps": "2131", "bps": "52002", "roe": "",
            "return_code": 0, "return_msg": "정상적으로 처리되었습니다"
        }"#;

        let page =
            KiwoomSource::parse_fundamental_page(body, Some("N"), None, &signatures()).unwrap();
        assert!(!page.has_more);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].market_cap.as_deref(), Some("4310000"));
        assert_eq!(page.items[0].per.as_deref(), Some("33.87"));
        assert_eq!(page.items[0].roe.as_deref(), Some(""));

        let empty = r#"{"stk_cd": "005930", "per": "", "return_code": 0}"#;
        let page =
            KiwoomSource::parse_fundamental_page(empty, None, None, &signatures()).unwrap();
        assert!(page.items.is_empty());
    }

    #[test]
    fn test_malformed_body() {
        let err = KiwoomSource::parse_page("<html>", None, None, &signatures()).unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)));
    }

    #[tokio::test]
    async fn test_period_series_is_unsupported() {
        let source = KiwoomSource::new(KiwoomConfig::default()).unwrap();
        let credential = Credential::new("token").unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();

        let err = source
            .fetch_period_series(&credential, "005930", day, day)
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Unsupported { .. }));
    }
}
