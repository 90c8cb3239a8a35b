//! Tipos de entrada: células da planilha, locais e embarques.

use serde::{Deserialize, Serialize};

use crate::geo::normalize::normalize_text;

/// Célula de planilha.
///
/// Desserializa diretamente de um array JSON 2-D (`null`, número, texto ou booleano).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
    Bool(bool),
    Empty,
}

impl Cell {
    /// Texto da célula, aparado. Vazio para células vazias.
    pub fn as_text(&self) -> String {
        match self {
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Cell::Number(n) => n.to_string(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Bool(b) => b.to_string(),
            Cell::Empty => String::new(),
        }
    }

    /// Verifica se a célula está vazia ou contém apenas espaços.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

/// Tipo de carga da tabela ANTT.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CargoType {
    GranelSolido,
    GranelLiquido,
    Frigorificada,
    Conteinerizada,
    #[default]
    CargaGeral,
    Neogranel,
    Perigosa,
}

impl CargoType {
    /// Todos os tipos conhecidos.
    pub const ALL: [CargoType; 7] = [
        CargoType::GranelSolido,
        CargoType::GranelLiquido,
        CargoType::Frigorificada,
        CargoType::Conteinerizada,
        CargoType::CargaGeral,
        CargoType::Neogranel,
        CargoType::Perigosa,
    ];

    /// Interpreta texto livre da planilha ("Granel sólido", "FRIGORIFICADA", ...).
    pub fn parse_loose(text: &str) -> Option<Self> {
        let norm = normalize_text(text);
        if norm.is_empty() {
            return None;
        }
        if norm.contains("PERIGOS") {
            Some(CargoType::Perigosa)
        } else if norm.contains("NEOGRANEL") {
            Some(CargoType::Neogranel)
        } else if norm.contains("GRANEL") && norm.contains("LIQUID") {
            Some(CargoType::GranelLiquido)
        } else if norm.contains("GRANEL") {
            Some(CargoType::GranelSolido)
        } else if norm.contains("FRIGO") || norm.contains("REFRIGER") {
            Some(CargoType::Frigorificada)
        } else if norm.contains("CONTEINER") || norm.contains("CONTAINER") {
            Some(CargoType::Conteinerizada)
        } else if norm.contains("GERAL") {
            Some(CargoType::CargaGeral)
        } else {
            None
        }
    }
}

impl std::fmt::Display for CargoType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CargoType::GranelSolido => write!(f, "granel_solido"),
            CargoType::GranelLiquido => write!(f, "granel_liquido"),
            CargoType::Frigorificada => write!(f, "frigorificada"),
            CargoType::Conteinerizada => write!(f, "conteinerizada"),
            CargoType::CargaGeral => write!(f, "carga_geral"),
            CargoType::Neogranel => write!(f, "neogranel"),
            CargoType::Perigosa => write!(f, "perigosa"),
        }
    }
}

impl std::str::FromStr for CargoType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CargoType::ALL
            .iter()
            .copied()
            .find(|c| c.to_string() == s.trim().to_lowercase())
            .or_else(|| CargoType::parse_loose(s))
            .ok_or_else(|| format!("tipo de carga desconhecido: {}", s))
    }
}

/// Cidade + UF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Place {
    pub city: String,
    pub state: String,
}

impl Place {
    pub fn new(city: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            state: state.into(),
        }
    }

    /// Separa "CIDADE/UF" ou "Cidade - UF". Retorna `None` se não houver UF reconhecível.
    pub fn split_embedded_state(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        let idx = trimmed.rfind(['/', '-', ','])?;
        let (city, state) = (trimmed[..idx].trim(), trimmed[idx + 1..].trim());
        if city.is_empty() || state.len() != 2 || !state.chars().all(|c| c.is_ascii_alphabetic()) {
            return None;
        }
        Some(Self::new(city, state.to_uppercase()))
    }

    /// Interpreta "CIDADE/UF"; sem UF, a cidade fica com estado vazio.
    pub fn parse(text: &str) -> Self {
        Self::split_embedded_state(text).unwrap_or_else(|| Self::new(text.trim(), ""))
    }
}

impl std::fmt::Display for Place {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.state.is_empty() {
            write!(f, "{}", self.city)
        } else {
            write!(f, "{}/{}", self.city, self.state)
        }
    }
}

/// Coordenada geográfica em graus decimais.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Origem de uma coordenada.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeoSource {
    /// Retornada pelo serviço de geocodificação.
    Network,
    /// Tabela estática de coordenadas estimadas.
    Estimated,
}

/// Resultado de geocodificação.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeHit {
    pub point: GeoPoint,
    pub label: String,
    pub source: GeoSource,
}

/// Resumo de rota rodoviária.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteSummary {
    pub distance_km: f64,
    pub duration_min: f64,
}

/// Método usado para chegar à distância.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMethod {
    /// Origem e destino na mesma cidade.
    SameCity,
    /// Distância rodoviária real.
    Routed,
    /// Círculo máximo com fator de correção.
    GreatCircle,
    /// Média estática por UF.
    RegionEstimate,
}

impl DistanceMethod {
    /// Distâncias estimadas são menos confiáveis que as roteadas.
    pub fn is_estimated(&self) -> bool {
        matches!(self, DistanceMethod::GreatCircle | DistanceMethod::RegionEstimate)
    }
}

impl std::fmt::Display for DistanceMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DistanceMethod::SameCity => write!(f, "same_city"),
            DistanceMethod::Routed => write!(f, "routed"),
            DistanceMethod::GreatCircle => write!(f, "great_circle"),
            DistanceMethod::RegionEstimate => write!(f, "region_estimate"),
        }
    }
}

/// Embarque extraído de uma linha da planilha.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    pub origin: Place,
    pub destination: Place,
    pub branch: Option<String>,
    pub axle_count: u8,
    pub cargo_type: CargoType,
    pub charged_value: Option<f64>,
    pub toll: f64,
    pub batch_id: Option<String>,
    pub plate: Option<String>,
    pub carrier: Option<String>,
    pub issue_date: Option<String>,
    pub vehicle_type: Option<String>,
    pub gross_weight: Option<f64>,
}
