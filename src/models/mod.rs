pub mod cliente;

pub use cliente::{
    ClaveCliente, ClaveError, Cliente, ClienteCambios, Errores, FiltroBusqueda, NuevoCliente, ITEMS_PER_PAGE,
    MAX_PAGE, SEARCH_LIMIT,
};
