use crate::entities::promotion::{self, PromotionKind};
use crate::entities::voucher;
use rust_decimal::Decimal;
use serde::Serialize;

/// A cart line reduced to what pricing needs.
#[derive(Debug, Clone)]
pub struct PricedLine {
    pub unit_price: Decimal,
    pub quantity: i32,
}

impl PricedLine {
    pub fn total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Discount sources resolved before quoting. An unknown or expired promo code
/// is dropped before this point, so a `None` here means "no discount", never
/// an error.
#[derive(Debug, Clone, Default)]
pub struct DiscountTerms {
    pub promotion: Option<promotion::Model>,
    pub voucher: Option<voucher::Model>,
}

/// Computed checkout amounts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    pub subtotal: Decimal,
    pub discount_total: Decimal,
    pub delivery_charge: Decimal,
    pub total: Decimal,
}

/// Quotes a cart: `total = subtotal - discount + delivery_charge`.
///
/// Promotion and voucher discounts are each computed against the subtotal and
/// stack additively, clamped so the combined discount never exceeds the
/// subtotal. A free shipping promotion zeroes the delivery charge instead.
pub fn quote(lines: &[PricedLine], terms: &DiscountTerms, delivery_charge: Decimal) -> Quote {
    let subtotal: Decimal = lines.iter().map(PricedLine::total).sum();

    let mut discount = Decimal::ZERO;
    let mut delivery = delivery_charge;

    if let Some(promo) = &terms.promotion {
        let meets_minimum = promo
            .min_order_value
            .map_or(true, |minimum| subtotal >= minimum);
        if meets_minimum {
            match promo.kind {
                PromotionKind::Percentage => {
                    let mut amount = subtotal * promo.value / Decimal::from(100);
                    if let Some(cap) = promo.max_discount {
                        amount = amount.min(cap);
                    }
                    discount += amount;
                }
                PromotionKind::FixedAmount => {
                    discount += promo.value;
                }
                PromotionKind::FreeShipping => {
                    delivery = Decimal::ZERO;
                }
            }
        }
    }

    if let Some(voucher) = &terms.voucher {
        let amount = subtotal * voucher.discount_percent / Decimal::from(100);
        discount += amount.min(voucher.max_discount);
    }

    let discount_total = discount.min(subtotal);
    Quote {
        subtotal,
        discount_total,
        delivery_charge: delivery,
        total: subtotal - discount_total + delivery,
    }
}
