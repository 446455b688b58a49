use crate::config::TradingConfig;
use crate::error::{Error, Result};
use crate::orders::order::{OrderType, Side};
use crate::types::price::Price;
use crate::types::quantity::Quantity;
use crate::types::ticker::Ticker;
use crate::types::ids::UserId;

/// A placement as it arrives from the outer layer.
#[derive(Clone, Debug)]
pub struct OrderRequest {
    pub user_id: UserId,
    pub ticker: Ticker,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Quantity,
    pub limit_price: Option<Price>,
}

pub struct OrderValidator {
    max_order_quantity: Quantity,
}

impl OrderValidator {
    pub fn new(config: &TradingConfig) -> Self {
        OrderValidator {
            max_order_quantity: config.max_quantity(),
        }
    }

    pub fn validate(&self, request: &OrderRequest) -> Result<()> {
        use crate::observability::metrics::ORDERS_REJECTED;

        let result = self.validate_quantity(request.quantity)
            .and_then(|_| self.validate_order_type_constraints(request));

        if let Err(e) = &result {
            ORDERS_REJECTED.with_label_values(&[e.reason()]).inc();
        }
        result
    }

    fn validate_quantity(&self, quantity: Quantity) -> Result<()> {
        if !quantity.is_positive() {
            return Err(Error::InvalidQuantity(quantity.to_i64()));
        }

        if quantity > self.max_order_quantity {
            return Err(Error::AboveMaxOrderSize {
                quantity,
                max: self.max_order_quantity,
            });
        }

        Ok(())
    }

    fn validate_order_type_constraints(&self, request: &OrderRequest) -> Result<()> {
        match (request.order_type, request.limit_price) {
            (OrderType::Market, Some(_)) => Err(Error::MarketOrderHasPrice),
            (OrderType::Market, None) => Ok(()),
            (OrderType::Limit, None) => Err(Error::LimitOrderRequiresPrice),
            (OrderType::Limit, Some(price)) if !price.is_positive() => Err(Error::InvalidPrice(price)),
            (OrderType::Limit, Some(_)) => Ok(()),
        }
    }
}
