//! Payment gateway adapters.
//!
//! - `FlowGatewayAdapter` - Flow REST API over reqwest
//! - `MockPaymentGateway` - Configurable test double

mod flow_adapter;
mod mock_gateway;
mod params;

pub use flow_adapter::{FlowConfig, FlowGatewayAdapter};
pub use mock_gateway::{MethodCall, MockPaymentGateway};
pub use params::{CreateOrderParams, GatewayParams, StatusQueryParams, SIGNATURE_FIELD};
