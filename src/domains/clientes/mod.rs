pub mod error;
pub mod service;
pub mod validation;

pub use error::{ClienteError, ExamplePayload};
pub use service::{ClienteService, ClientesPage, ConteoClientes, DataSource, Fetched};
pub use validation::ContactoCliente;
