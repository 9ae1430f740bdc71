//! Certificate issuance through certbot.
//!
//! Uses the HTTP-01 webroot challenge: certbot drops tokens under
//! `{webroot}/.well-known/acme-challenge/` and the generated nginx
//! configuration serves that directory on port 80.

mod issuer;

pub use issuer::{certify_args, validate_request, CertificateIssuer};
