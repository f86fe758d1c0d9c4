use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::ExamOrder;
use crate::db::types::OrderStatus;
use crate::repositories::orders::{OrderListRow, OrderReviewRow};
use crate::schemas::Bilingual;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct OrderCreateRequest {
    #[serde(alias = "examId")]
    #[validate(length(min = 1, message = "exam_id must not be empty"))]
    pub(crate) exam_id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct OrderResponse {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) currency: String,
    pub(crate) price_at_purchase: f64,
    pub(crate) discount_amount: f64,
    pub(crate) paid_amount: f64,
    pub(crate) status: OrderStatus,
    pub(crate) payment_method: String,
    pub(crate) receipt_url: Option<String>,
    pub(crate) bank_ref: Option<String>,
    pub(crate) reject_reason: Option<String>,
    pub(crate) created_at: String,
    pub(crate) paid_at: Option<String>,
    pub(crate) reused: bool,
}

impl OrderResponse {
    pub(crate) fn from_db(order: ExamOrder, reused: bool) -> Self {
        Self {
            id: order.id,
            exam_id: order.exam_id,
            currency: order.currency,
            price_at_purchase: order.price_at_purchase,
            discount_amount: order.discount_amount,
            paid_amount: order.paid_amount,
            status: order.status,
            payment_method: order.payment_method,
            receipt_url: order.receipt_url,
            bank_ref: order.bank_ref,
            reject_reason: order.reject_reason,
            created_at: format_primitive(order.created_at),
            paid_at: order.paid_at.map(format_primitive),
            reused,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct OrderHistoryItem {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) exam_title_ar: String,
    pub(crate) exam_title_en: Option<String>,
    pub(crate) currency: String,
    pub(crate) price_at_purchase: f64,
    pub(crate) paid_amount: f64,
    pub(crate) status: OrderStatus,
    pub(crate) receipt_url: Option<String>,
    pub(crate) bank_ref: Option<String>,
    pub(crate) reject_reason: Option<String>,
    pub(crate) created_at: String,
    pub(crate) paid_at: Option<String>,
}

impl OrderHistoryItem {
    pub(crate) fn from_row(row: OrderListRow) -> Self {
        Self {
            id: row.id,
            exam_id: row.exam_id,
            exam_title_ar: row.exam_title_ar,
            exam_title_en: row.exam_title_en,
            currency: row.currency,
            price_at_purchase: row.price_at_purchase,
            paid_amount: row.paid_amount,
            status: row.status,
            receipt_url: row.receipt_url,
            bank_ref: row.bank_ref,
            reject_reason: row.reject_reason,
            created_at: format_primitive(row.created_at),
            paid_at: row.paid_at.map(format_primitive),
        }
    }
}

/// Instructor review-queue item.
#[derive(Debug, Serialize)]
pub(crate) struct OrderReviewItem {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) user_name: String,
    pub(crate) user_email: String,
    pub(crate) exam_id: String,
    pub(crate) exam_title_ar: String,
    pub(crate) exam_title_en: Option<String>,
    pub(crate) paid_amount: f64,
    pub(crate) currency: String,
    pub(crate) status: OrderStatus,
    pub(crate) receipt_url: Option<String>,
    pub(crate) bank_ref: Option<String>,
    pub(crate) created_at: String,
    pub(crate) paid_at: Option<String>,
}

impl OrderReviewItem {
    pub(crate) fn from_row(row: OrderReviewRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            user_name: row.user_name,
            user_email: row.user_email,
            exam_id: row.exam_id,
            exam_title_ar: row.exam_title_ar,
            exam_title_en: row.exam_title_en,
            paid_amount: row.paid_amount,
            currency: row.currency,
            status: row.status,
            receipt_url: row.receipt_url,
            bank_ref: row.bank_ref,
            created_at: format_primitive(row.created_at),
            paid_at: row.paid_at.map(format_primitive),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RejectOrderRequest {
    #[serde(default)]
    pub(crate) reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct OrderActionResponse {
    pub(crate) order_id: String,
    pub(crate) status: OrderStatus,
    pub(crate) message: Bilingual,
}

#[derive(Debug, Serialize)]
pub(crate) struct ReceiptUploadResponse {
    pub(crate) order_id: String,
    pub(crate) status: OrderStatus,
    pub(crate) receipt_url: String,
    pub(crate) message: Bilingual,
}
