//! Aggregates module
pub mod category;
pub mod discount;
pub mod notification;
pub mod order;
pub mod product;
pub mod report;
pub mod user;

pub use category::{Category, CategoryForm};
pub use discount::{DiscountCode, DiscountUpdate, NewDiscountCode};
pub use notification::{Notification, NotificationForm};
pub use order::{allowed_transitions, bucket, BucketSpec, LineItem, Order, OrderError, OrderStatus, PaymentStatus, ShippingAddress, StatusChange, ORDER_BUCKETS};
pub use product::{ImageSlot, ImageSlots, Product, ProductError, ProductForm, ProductStatus, Variant, VariantCell, VariantMatrix, MAX_IMAGES};
pub use report::{DashboardSummary, DateRange, Granularity, RevenuePoint, SalesBucket};
pub use user::{AccountStatus, NewStaff, Role, User};
