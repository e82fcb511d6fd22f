// storefront/src/models/mod.rs

//! Records mirrored from database tables.

pub mod appointment;
pub mod cart_item;
pub mod discount;
pub mod invoice;
pub mod order;
pub mod order_item;
pub mod payment_method;
pub mod product;
pub mod user;

pub use appointment::{Appointment, AppointmentSlot, AppointmentStatus};
pub use cart_item::{CartLine, SavedCart};
pub use discount::{DiscountCode, DiscountInput, DiscountKind};
pub use invoice::{Invoice, InvoiceStatus};
pub use order::{Order, OrderStatus};
pub use order_item::OrderItem;
pub use payment_method::{PaymentKind, PaymentMethod, PaymentMethodInput};
pub use product::{Product, ProductInput};
pub use user::{User, UserRole};
