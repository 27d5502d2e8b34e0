//! Typed records for the upstream JSON payloads, for library callers that
//! decode an envelope with [`Envelope::decode`](crate::envelope::Envelope::decode).
//! The façades relay payloads untouched and never go through these.
//!
//! Numeric fields default to zero when upstream omits them so a missing
//! column does not fail the whole decode; fields upstream reports as `null`
//! are `Option`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    pub user_id: String,
    pub user_name: String,
    pub user_type: String,
    pub email: String,
    pub broker: String,
    pub exchanges: Vec<String>,
    pub products: Vec<String>,
    pub order_types: Vec<String>,
    pub poa: bool,
    pub is_active: bool,
    pub phone: Option<String>,
    pub enabled_exchanges: Option<Vec<String>>,
    pub enabled_products: Option<Vec<String>>,
    pub is_logging_enabled: Option<bool>,
}

/// Margin summary for one segment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentMargin {
    pub used_margin: f64,
    pub payin_amount: f64,
    pub span_margin: f64,
    pub adhoc_margin: f64,
    pub notional_cash: f64,
    pub available_margin: f64,
    pub exposure_margin: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fund {
    #[serde(rename = "type")]
    pub kind: String,
    pub segment: String,
    pub exchange: String,
    #[serde(flatten)]
    pub margin: SegmentMargin,
    pub delivery_margin: f64,
    pub collateral: f64,
    pub realized_mtm: f64,
    pub unrealized_mtm: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FundsAndMargin {
    /// Absent when the request was filtered to the commodity segment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equity: Option<SegmentMargin>,
    /// Absent when the request was filtered to the equity segment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commodity: Option<SegmentMargin>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fund_limit: Vec<Fund>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Holding {
    pub isin: String,
    pub company_name: String,
    pub trading_symbol: String,
    pub tradingsymbol: String,
    pub instrument_token: String,
    pub exchange: String,
    pub product: String,
    pub quantity: i64,
    pub t1_quantity: i64,
    pub cnc_used_quantity: i64,
    pub collateral_type: String,
    pub collateral_quantity: i64,
    pub collateral_update_quantity: i64,
    pub haircut: f64,
    pub average_price: f64,
    pub last_price: f64,
    pub close_price: f64,
    pub pnl: f64,
    pub day_change: f64,
    pub day_change_percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShortTermPosition {
    pub exchange: String,
    pub instrument_token: String,
    pub trading_symbol: String,
    pub tradingsymbol: String,
    pub product: String,
    pub quantity: i64,
    pub multiplier: f64,
    pub value: f64,
    pub pnl: f64,
    pub average_price: Option<f64>,
    pub last_price: f64,
    pub close_price: f64,
    pub unrealised: f64,
    pub realised: f64,
    pub buy_value: f64,
    pub buy_price: f64,
    pub sell_value: f64,
    pub sell_price: f64,
    pub day_buy_quantity: i64,
    pub day_buy_value: f64,
    pub day_buy_price: f64,
    pub day_sell_quantity: i64,
    pub day_sell_value: f64,
    pub day_sell_price: f64,
    pub overnight_quantity: i64,
    pub overnight_buy_quantity: i64,
    pub overnight_buy_amount: f64,
    pub overnight_sell_quantity: i64,
    pub overnight_sell_amount: f64,
}

/// Margin-trading-facility position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MtfPosition {
    pub exchange: String,
    pub instrument_token: String,
    pub trading_symbol: String,
    pub product: String,
    pub quantity: i64,
    pub average_price: Option<f64>,
    pub last_price: f64,
    pub close_price: f64,
    pub pnl: f64,
    pub value: f64,
    pub day_buy_quantity: i64,
    pub day_sell_quantity: i64,
}

/// One entry of the day's order book.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Order {
    pub order_id: String,
    pub exchange_order_id: Option<String>,
    pub instrument_token: String,
    pub trading_symbol: String,
    pub exchange: String,
    pub product: String,
    pub order_type: String,
    pub transaction_type: String,
    pub validity: String,
    pub status: String,
    pub status_message: Option<String>,
    pub quantity: i64,
    pub filled_quantity: i64,
    pub pending_quantity: i64,
    pub disclosed_quantity: i64,
    pub price: f64,
    pub trigger_price: f64,
    pub average_price: f64,
    pub is_amo: bool,
    pub tag: Option<String>,
    pub order_timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaceOrderResponse {
    pub order_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn profile_decodes_with_missing_optional_fields() {
        let profile: UserProfile = serde_json::from_value(json!({
            "email": "trader@example.com",
            "exchanges": ["NSE", "BSE"],
            "products": ["D", "I"],
            "broker": "UPSTOX",
            "user_id": "AB1234",
            "user_name": "A Trader",
            "order_types": ["MARKET", "LIMIT"],
            "user_type": "individual",
            "poa": false,
            "is_active": true
        }))
        .unwrap();
        assert_eq!(profile.user_id, "AB1234");
        assert_eq!(profile.exchanges, vec!["NSE", "BSE"]);
        assert!(profile.phone.is_none());
    }

    #[test]
    fn funds_for_single_segment_omit_other() {
        let funds: FundsAndMargin = serde_json::from_value(json!({
            "equity": {
                "used_margin": 12.5,
                "payin_amount": 0,
                "span_margin": 0,
                "adhoc_margin": 0,
                "notional_cash": 0,
                "available_margin": 1000.25,
                "exposure_margin": 0
            }
        }))
        .unwrap();
        assert!(funds.commodity.is_none());
        assert!(funds.fund_limit.is_empty());
        let equity = funds.equity.as_ref().unwrap();
        assert!((equity.available_margin - 1000.25).abs() < f64::EPSILON);

        let back = serde_json::to_value(&funds).unwrap();
        assert!(back.get("commodity").is_none());
    }

    #[test]
    fn fund_limit_entries_flatten_margin() {
        let fund: Fund = serde_json::from_value(json!({
            "type": "CASH",
            "segment": "SEC",
            "exchange": "NSE",
            "used_margin": 1.0,
            "available_margin": 2.0,
            "collateral": 3.0
        }))
        .unwrap();
        assert_eq!(fund.kind, "CASH");
        assert!((fund.margin.available_margin - 2.0).abs() < f64::EPSILON);
        assert!((fund.collateral - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn position_average_price_may_be_null() {
        let pos: ShortTermPosition = serde_json::from_value(json!({
            "exchange": "NSE",
            "instrument_token": "NSE_EQ|INE848E01016",
            "quantity": 0,
            "average_price": null,
            "pnl": -12.4
        }))
        .unwrap();
        assert!(pos.average_price.is_none());
        assert!((pos.pnl + 12.4).abs() < f64::EPSILON);
    }
}
