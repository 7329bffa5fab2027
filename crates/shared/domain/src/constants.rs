//! Well-known identifiers of the built-in business catalogue.

// Capabilities
pub const PHYSICAL_PRODUCTS: &str = "physical_products";
pub const PROFESSIONAL_SERVICES: &str = "professional_services";
pub const SUBSCRIPTIONS: &str = "subscriptions";
pub const CASH_HANDLING: &str = "cash_handling";
pub const ONLINE_STORE: &str = "online_store";
pub const EMPLOYEES: &str = "employees";

// Features
pub const INVENTORY: &str = "inventory";
pub const PRODUCT_CATALOG: &str = "product_catalog";
pub const SHIPPING: &str = "shipping";
pub const APPOINTMENTS: &str = "appointments";
pub const SERVICE_CATALOG: &str = "service_catalog";
pub const TIME_TRACKING: &str = "time_tracking";
pub const RECURRING_BILLING: &str = "recurring_billing";
pub const CASH_DRAWER: &str = "cash_drawer";
pub const STOREFRONT: &str = "storefront";
pub const STAFF_MANAGEMENT: &str = "staff_management";
pub const POINT_OF_SALE: &str = "point_of_sale";
pub const ONLINE_BOOKING: &str = "online_booking";
pub const INVOICING: &str = "invoicing";
pub const SHIFT_PLANNING: &str = "shift_planning";
pub const CARD_PAYMENTS: &str = "card_payments";
pub const CARD_PRESENT: &str = "card_present";

// Infrastructure selectors
pub const PAYMENT_TERMINAL: &str = "payment_terminal";
pub const PAYMENT_GATEWAY: &str = "payment_gateway";
pub const OFFLINE_MODE: &str = "offline_mode";
