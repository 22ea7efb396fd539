use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum GatewayError {
    #[snafu(display("invalid backend base URL '{raw}' on `{stage}`: {message}"))]
    InvalidBaseUrl {
        stage: &'static str,
        raw: String,
        message: String,
    },
    #[snafu(display("failed to build backend endpoint from '{base}' on `{stage}`: {message}"))]
    InvalidEndpoint {
        stage: &'static str,
        base: String,
        message: String,
    },
}

pub type GatewayResult<T> = Result<T, GatewayError>;
