//! Tipos de erro do Pisofrete.

use thiserror::Error;

/// Tipo de resultado padrão do Pisofrete.
pub type FreteResult<T> = Result<T, FreteError>;

/// Erros possíveis no Pisofrete.
#[derive(Error, Debug)]
pub enum FreteError {
    #[error("Erro de configuração: {0}")]
    Config(String),

    #[error("Erro de IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("Erro ao parsear TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Erro ao serializar TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Erro de JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Coluna obrigatória ausente: {field}{}", suggestion_suffix(.suggestion))]
    MissingColumn {
        field: &'static str,
        suggestion: Option<String>,
    },

    #[error("Planilha vazia: nenhuma linha de dados encontrada")]
    EmptyDataset,

    #[error("Linha {row}: {message}")]
    Row { row: usize, message: String },

    #[error("Erro no cálculo do piso: {0}")]
    Tariff(String),

    #[error("Falha na consulta de mapas: {0}")]
    Lookup(#[from] LookupError),

    #[error("Processamento cancelado")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(header) => format!(" (cabeçalho mais próximo: '{}')", header),
        None => String::new(),
    }
}

impl FreteError {
    /// Cria um erro genérico.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Self::Other(msg.into())
    }

    /// Cria um erro de configuração.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Cria um erro de linha.
    pub fn row<S: Into<String>>(row: usize, msg: S) -> Self {
        Self::Row {
            row,
            message: msg.into(),
        }
    }
}

/// Falhas de consulta ao serviço de mapas.
///
/// Clonável porque o mesmo resultado é entregue a todos os chamadores
/// que aguardam uma consulta em andamento para a mesma chave.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("não encontrado: {0}")]
    NotFound(String),

    #[error("timeout após {0} ms")]
    Timeout(u64),

    #[error("erro HTTP: {0}")]
    Http(String),

    #[error("status HTTP {0}")]
    Status(u16),

    #[error("resposta inválida: {0}")]
    Payload(String),

    #[error("chave de API ausente")]
    MissingApiKey,

    #[error("consulta abandonada: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for LookupError {
    fn from(err: reqwest::Error) -> Self {
        // A URL carrega a chave de API: nunca vai para a mensagem
        let err = err.without_url();
        if err.is_timeout() {
            return Self::Timeout(0);
        }
        match err.status() {
            Some(status) if status.as_u16() == 404 => Self::NotFound(err.to_string()),
            Some(status) => Self::Status(status.as_u16()),
            None if err.is_decode() => Self::Payload(err.to_string()),
            None => Self::Http(err.to_string()),
        }
    }
}
