// Domain layer: identifiers, records, requests/responses and the collaborator ports.

pub mod model;
pub mod ports;
