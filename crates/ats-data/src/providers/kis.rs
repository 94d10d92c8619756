//! KIS (Korea Investment & Securities) REST client: period prices,
//! investor trend and financial ratios.

use async_trait::async_trait;
use ats_core::error::SourceError;
use ats_core::traits::MarketDataSource;
use ats_core::types::{
    Credential, DailyPage, InvestorFlowItem, RawDailyItem, RawFinancialRatioItem,
};
use chrono::NaiveDate;
use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use super::{
    build_client, classify_failure, header_value, lenient_string, map_transport_error,
    HttpSettings, RateLimitSignatures,
};
use crate::normalize::format_date;

const PROVIDER: &str = "KIS";
const PERIOD_PRICE_PATH: &str = "/uapi/domestic-stock/v1/quotations/inquire-daily-itemchartprice";
const PERIOD_PRICE_TR_ID: &str = "FHKST03010100";
const INVESTOR_PATH: &str = "/uapi/domestic-stock/v1/quotations/inquire-investor";
const INVESTOR_TR_ID: &str = "FHKST01010900";
const FINANCIAL_RATIO_PATH: &str = "/uapi/domestic-stock/v1/finance/financial-ratio";
const FINANCIAL_RATIO_TR_ID: &str = "FHKST66430300";

/// KIS client configuration.
#[derive(Debug, Clone)]
pub struct KisConfig {
    pub base_url: String,
    pub app_key: String,
    pub app_secret: String,
    pub http: HttpSettings,
    pub rate_limit_signatures: RateLimitSignatures,
}

impl KisConfig {
    /// Create config with the production endpoint and the known throttling codes.
    pub fn new(app_key: impl Into<String>, app_secret: impl Into<String>) -> Self {
        Self {
            base_url: "https://openapi.koreainvestment.com:9443".to_string(),
            app_key: app_key.into(),
            app_secret: app_secret.into(),
            http: HttpSettings::default(),
            rate_limit_signatures: RateLimitSignatures::new(["EGW00201", "msg1\":\"초당"]),
        }
    }
}

/// Envelope shared by KIS quotation responses.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    rt_cd: Option<String>,
    #[serde(default)]
    msg_cd: Option<String>,
    #[serde(default)]
    msg1: Option<String>,
    #[serde(flatten)]
    body: T,
}

#[derive(Debug, Deserialize)]
struct PeriodPriceBody {
    #[serde(default)]
    output2: Vec<PeriodPriceItem>,
}

#[derive(Debug, Deserialize)]
struct PeriodPriceItem {
    #[serde(default)]
    stck_bsop_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    stck_oprc: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    stck_hgpr: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    stck_lwpr: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    stck_clpr: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    acml_vol: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    acml_tr_pbmn: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    prdy_ctrt: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InvestorBody {
    #[serde(default)]
    output: Vec<InvestorItem>,
}

#[derive(Debug, Deserialize)]
struct InvestorItem {
    #[serde(default)]
    stck_bsop_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    prdy_ctrt: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    prsn_ntby_qty: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    orgn_ntby_qty: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    frgn_ntby_qty: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FinancialRatioBody {
    #[serde(default)]
    output: Vec<FinancialRatioItem>,
}

#[derive(Debug, Deserialize)]
struct FinancialRatioItem {
    #[serde(default)]
    stac_yymm: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    grs: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    bsop_prfi_inrt: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    ntin_inrt: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    roe_val: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    eps: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    sps: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    bps: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    rsrv_rate: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    lblt_rate: Option<String>,
}

/// KIS market data client.
pub struct KisSource {
    config: KisConfig,
    client: Client,
}

impl KisSource {
    /// Create a new client. App key and secret travel as default headers.
    pub fn new(config: KisConfig) -> Result<Self, SourceError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json; charset=utf-8"),
        );
        headers.insert("appkey", header_value("appkey", &config.app_key)?);
        headers.insert("appsecret", header_value("appsecret", &config.app_secret)?);
        headers.insert("custtype", header::HeaderValue::from_static("P"));

        let client = build_client(&config.http, headers)?;
        Ok(Self { config, client })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        credential: &Credential,
        path: &str,
        tr_id: &'static str,
        params: &[(&str, String)],
    ) -> Result<T, SourceError> {
        let url = format!("{}{}", self.config.base_url, path);

        let resp = self
            .client
            .get(&url)
            .header(
                header::AUTHORIZATION,
                header_value("authorization", &format!("Bearer {}", credential.expose()))?,
            )
            .header("tr_id", tr_id)
            .query(params)
            .send()
            .await
            .map_err(|e| map_transport_error(PROVIDER, e))?;

        let status = resp.status();
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

        Self::decode(&body, &self.config.rate_limit_signatures)
    }

    /// Decode a successful HTTP body, honouring the `rt_cd` result code.
    fn decode<T: DeserializeOwned>(
        body: &str,
        signatures: &RateLimitSignatures,
    ) -> Result<T, SourceError> {
        let envelope: Envelope<T> =
            serde_json::from_str(body).map_err(|e| SourceError::Parse(e.to_string()))?;

        match envelope.rt_cd.as_deref() {
            None | Some("0") => Ok(envelope.body),
            Some(_) => {
                debug!(
                    msg_cd = ?envelope.msg_cd,
                    msg1 = ?envelope.msg1,
                    "KIS rejected request"
                );
                Err(classify_failure(
                    PROVIDER,
                    reqwest::StatusCode::OK,
                    body,
                    signatures,
                ))
            }
        }
    }

    fn period_items(body: PeriodPriceBody) -> Vec<RawDailyItem> {
        body.output2
            .into_iter()
            // Trailing placeholder rows come back without a date.
            .filter_map(|item| {
                let date = item.stck_bsop_date.filter(|d| !d.trim().is_empty())?;
                Some(RawDailyItem {
                    date,
                    open: item.stck_oprc,
                    high: item.stck_hgpr,
                    low: item.stck_lwpr,
                    close: item.stck_clpr,
                    volume: item.acml_vol,
                    turnover: item.acml_tr_pbmn,
                    change_rate: item.prdy_ctrt,
                    individual_net: None,
                    institution_net: None,
                    foreign_net: None,
                })
            })
            .collect()
    }

    fn investor_items(body: InvestorBody) -> Vec<InvestorFlowItem> {
        body.output
            .into_iter()
            .filter_map(|item| {
                let date = item.stck_bsop_date.filter(|d| !d.trim().is_empty())?;
                Some(InvestorFlowItem {
                    date,
                    change_rate: item.prdy_ctrt,
                    individual_net: item.prsn_ntby_qty,
                    institution_net: item.orgn_ntby_qty,
                    foreign_net: item.frgn_ntby_qty,
                })
            })
            .collect()
    }

    fn ratio_items(body: FinancialRatioBody) -> Vec<RawFinancialRatioItem> {
        body.output
            .into_iter()
            .map(|item| RawFinancialRatioItem {
                period: item.stac_yymm.unwrap_or_default(),
                revenue_growth: item.grs,
                operating_profit_growth: item.bsop_prfi_inrt,
                net_income_growth: item.ntin_inrt,
                roe: item.roe_val,
                eps: item.eps,
                sps: item.sps,
                bps: item.bps,
                reserve_ratio: item.rsrv_rate,
                debt_ratio: item.lblt_rate,
            })
            .collect()
    }
}

#[async_trait]
impl MarketDataSource for KisSource {
    /// Single-page daily series for one date.
    async fn fetch_daily_series(
        &self,
        credential: &Credential,
        instrument: &str,
        date: NaiveDate,
        _continuation: Option<&str>,
    ) -> Result<DailyPage, SourceError> {
        let items = self.fetch_period_series(credential, instrument, date, date).await?;
        Ok(DailyPage {
            items,
            has_more: false,
            next_key: None,
        })
    }

    async fn fetch_period_series(
        &self,
        credential: &Credential,
        instrument: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawDailyItem>, SourceError> {
        let params = [
            ("FID_COND_MRKT_DIV_CODE", "J".to_string()),
            ("FID_INPUT_ISCD", instrument.to_string()),
            ("FID_INPUT_DATE_1", format_date(start)),
            ("FID_INPUT_DATE_2", format_date(end)),
            ("FID_PERIOD_DIV_CODE", "D".to_string()),
            ("FID_ORG_ADJ_PRC", "1".to_string()),
        ];

        let body: PeriodPriceBody = self
            .get(credential, PERIOD_PRICE_PATH, PERIOD_PRICE_TR_ID, &params)
            .await?;
        Ok(Self::period_items(body))
    }

    async fn fetch_investor_flow(
        &self,
        credential: &Credential,
        instrument: &str,
        _date: NaiveDate,
    ) -> Result<Vec<InvestorFlowItem>, SourceError> {
        let params = [
            ("FID_COND_MRKT_DIV_CODE", "J".to_string()),
            ("FID_INPUT_ISCD", instrument.to_string()),
        ];

        let body: InvestorBody = self
            .get(credential, INVESTOR_PATH, INVESTOR_TR_ID, &params)
            .await?;
        Ok(Self::investor_items(body))
    }

    /// Yearly settlement periods, newest first as KIS returns them.
    async fn fetch_financial_ratios(
        &self,
        credential: &Credential,
        instrument: &str,
    ) -> Result<Vec<RawFinancialRatioItem>, SourceError> {
        let params = [
            // 0 = yearly, 1 = quarterly
            ("FID_DIV_CLS_CODE", "1".to_string()),
            ("FID_COND_MRKT_DIV_CODE", "J".to_string()),
            ("FID_INPUT_ISCD", instrument.to_string()),
        ];

        let body: FinancialRatioBody = self
            .get(credential, FINANCIAL_RATIO_PATH, FINANCIAL_RATIO_TR_ID, &params)
            .await?;
        Ok(Self::ratio_items(body))
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}
