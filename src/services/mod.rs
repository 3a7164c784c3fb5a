pub mod builds;
pub mod carts;
pub mod catalog;
pub mod checkout;
pub mod orders;
pub mod points;
pub mod pricing;
pub mod promotions;

pub use builds::BuildService;
pub use carts::CartService;
pub use catalog::CatalogService;
pub use checkout::CheckoutService;
pub use orders::OrderService;
pub use points::PointsService;
pub use promotions::PromotionService;
