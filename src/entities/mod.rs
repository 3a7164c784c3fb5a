pub mod build;
pub mod build_item;
pub mod cart;
pub mod cart_item;
pub mod category;
pub mod customer_points;
pub mod order;
pub mod order_item;
pub mod points_transaction;
pub mod product;
pub mod promotion;
pub mod shipping_address;
pub mod voucher;
