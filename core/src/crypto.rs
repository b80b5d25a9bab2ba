use tracing::debug;

pub fn init_crypto() {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("A rustls crypto provider is already installed");
    }
}
