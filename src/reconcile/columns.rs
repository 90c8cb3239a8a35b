//! Mapeamento de cabeçalhos da planilha para o esquema canônico.
//!
//! A resolução acontece uma vez por planilha. Cada campo tem uma lista de
//! padrões em ordem de prioridade; o primeiro cabeçalho ainda não reivindicado
//! que contém o padrão (após normalização, ignorando espaços e pontuação)
//! fica com o campo. Padrões de até duas letras (`UF`, `ID`, `NF`) exigem a
//! palavra inteira.

use strsim::{jaro_winkler, normalized_levenshtein};

use crate::geo::normalize::normalize_text;
use crate::types::errors::{FreteError, FreteResult};
use crate::types::shipment::Cell;

/// Similaridade mínima para sugerir um cabeçalho.
const SUGGESTION_THRESHOLD: f64 = 0.65;

/// Padrões até este tamanho só casam com palavras inteiras.
const SHORT_PATTERN_LEN: usize = 2;

/// Campos canônicos da planilha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnField {
    DestinationCity,
    AxleCount,
    State,
    BatchId,
    Plate,
    Carrier,
    FreightValue,
    IssueDate,
    VehicleType,
    GrossWeight,
    Branch,
    CargoType,
    Toll,
    OriginCity,
    OriginState,
}

impl ColumnField {
    /// Ordem de resolução. Campos com padrões mais específicos vêm antes
    /// dos que poderiam reivindicar o mesmo cabeçalho ("UF ORIGEM" antes de
    /// "ORIGEM", "PEDAGIO" antes de "VALOR", "PLACA" antes de "VEICULO").
    pub const RESOLUTION_ORDER: [ColumnField; 15] = [
        ColumnField::OriginState,
        ColumnField::State,
        ColumnField::OriginCity,
        ColumnField::DestinationCity,
        ColumnField::AxleCount,
        ColumnField::Plate,
        ColumnField::VehicleType,
        ColumnField::Toll,
        ColumnField::FreightValue,
        ColumnField::IssueDate,
        ColumnField::GrossWeight,
        ColumnField::Carrier,
        ColumnField::Branch,
        ColumnField::CargoType,
        ColumnField::BatchId,
    ];

    /// Nome do campo nas mensagens.
    pub fn label(&self) -> &'static str {
        match self {
            ColumnField::DestinationCity => "cidade de destino",
            ColumnField::AxleCount => "eixos",
            ColumnField::State => "UF de destino",
            ColumnField::BatchId => "lote",
            ColumnField::Plate => "placa",
            ColumnField::Carrier => "transportadora",
            ColumnField::FreightValue => "valor do frete",
            ColumnField::IssueDate => "data de emissão",
            ColumnField::VehicleType => "tipo de veículo",
            ColumnField::GrossWeight => "peso bruto",
            ColumnField::Branch => "filial",
            ColumnField::CargoType => "tipo de carga",
            ColumnField::Toll => "pedágio",
            ColumnField::OriginCity => "cidade de origem",
            ColumnField::OriginState => "UF de origem",
        }
    }

    /// Padrões reconhecidos, em ordem de prioridade.
    pub fn patterns(&self) -> &'static [&'static str] {
        match self {
            ColumnField::DestinationCity => &[
                "CIDADE DESTINO",
                "MUNICIPIO DESTINO",
                "DESTINO",
                "DESTINATARIO CIDADE",
                "CIDADE",
                "MUNICIPIO",
            ],
            ColumnField::AxleCount => &["QTD EIXOS", "EIXOS", "EIXO", "N EIXOS"],
            ColumnField::State => &["UF DESTINO", "ESTADO DESTINO", "UF DEST", "UF", "ESTADO"],
            ColumnField::BatchId => &["LOTE", "CTE", "CT E", "DOCUMENTO", "NF", "ID"],
            ColumnField::Plate => &["PLACA"],
            ColumnField::Carrier => &["TRANSPORTADORA", "TRANSPORTADOR", "PARCEIRO"],
            ColumnField::FreightValue => &["VALOR FRETE", "FRETE", "VALOR COBRADO", "VALOR"],
            ColumnField::IssueDate => &["DATA EMISSAO", "EMISSAO", "DATA"],
            ColumnField::VehicleType => &["TIPO VEICULO", "TIPO DE VEICULO", "VEICULO", "CARROCERIA"],
            ColumnField::GrossWeight => &["PESO BRUTO", "PESO"],
            ColumnField::Branch => &["FILIAL", "UNIDADE"],
            ColumnField::CargoType => &["TIPO CARGA", "TIPO DE CARGA", "CARGA"],
            ColumnField::Toll => &["PEDAGIO", "PEDAGIOS"],
            ColumnField::OriginCity => &["CIDADE ORIGEM", "MUNICIPIO ORIGEM", "ORIGEM"],
            ColumnField::OriginState => &["UF ORIGEM", "ESTADO ORIGEM"],
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(self, ColumnField::DestinationCity | ColumnField::AxleCount)
    }
}

/// Índices das colunas resolvidas. Campos ausentes ficam `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    pub destination_city: usize,
    pub axle_count: usize,
    pub state: Option<usize>,
    pub batch_id: Option<usize>,
    pub plate: Option<usize>,
    pub carrier: Option<usize>,
    pub freight_value: Option<usize>,
    pub issue_date: Option<usize>,
    pub vehicle_type: Option<usize>,
    pub gross_weight: Option<usize>,
    pub branch: Option<usize>,
    pub cargo_type: Option<usize>,
    pub toll: Option<usize>,
    pub origin_city: Option<usize>,
    pub origin_state: Option<usize>,
}

impl ColumnMap {
    /// Resolve o mapa a partir da linha de cabeçalho.
    pub fn resolve(headers: &[Cell]) -> FreteResult<Self> {
        let normalized: Vec<HeaderKey> = headers
            .iter()
            .map(|cell| HeaderKey::new(&cell.as_text()))
            .collect();
        let mut claimed = vec![false; headers.len()];
        let mut found: Vec<(ColumnField, usize)> = Vec::new();

        for field in ColumnField::RESOLUTION_ORDER {
            if let Some(idx) = find_header(field, &normalized, &claimed) {
                claimed[idx] = true;
                found.push((field, idx));
            }
        }

        let get = |field: ColumnField| {
            found
                .iter()
                .find(|(f, _)| *f == field)
                .map(|(_, idx)| *idx)
        };

        let require = |field: ColumnField| {
            get(field).ok_or_else(|| FreteError::MissingColumn {
                field: field.label(),
                suggestion: suggest_header(field, headers, &claimed),
            })
        };

        let map = Self {
            destination_city: require(ColumnField::DestinationCity)?,
            axle_count: require(ColumnField::AxleCount)?,
            state: get(ColumnField::State),
            batch_id: get(ColumnField::BatchId),
            plate: get(ColumnField::Plate),
            carrier: get(ColumnField::Carrier),
            freight_value: get(ColumnField::FreightValue),
            issue_date: get(ColumnField::IssueDate),
            vehicle_type: get(ColumnField::VehicleType),
            gross_weight: get(ColumnField::GrossWeight),
            branch: get(ColumnField::Branch),
            cargo_type: get(ColumnField::CargoType),
            toll: get(ColumnField::Toll),
            origin_city: get(ColumnField::OriginCity),
            origin_state: get(ColumnField::OriginState),
        };

        tracing::debug!(
            destination = map.destination_city,
            axles = map.axle_count,
            resolved = found.len(),
            "columns resolved"
        );
        Ok(map)
    }

    /// Célula da coluna, se presente na linha.
    pub fn cell<'a>(&self, row: &'a [Cell], column: Option<usize>) -> Option<&'a Cell> {
        column.and_then(|idx| row.get(idx))
    }

    /// Texto não vazio da coluna.
    pub fn text(&self, row: &[Cell], column: Option<usize>) -> Option<String> {
        self.cell(row, column)
            .filter(|cell| !cell.is_blank())
            .map(|cell| cell.as_text().trim().to_string())
            .filter(|text| !text.is_empty())
    }
}

/// Normaliza um cabeçalho em palavras separadas por espaço simples.
fn header_words(text: &str) -> String {
    let cleaned: String = normalize_text(text)
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cabeçalho normalizado em duas formas: palavras e texto compacto.
struct HeaderKey {
    words: String,
    compact: String,
}

impl HeaderKey {
    fn new(text: &str) -> Self {
        let words = header_words(text);
        let compact = compact(&words);
        Self { words, compact }
    }

    fn matches(&self, pattern: &str) -> bool {
        let needle = compact(pattern);
        if needle.len() <= SHORT_PATTERN_LEN {
            format!(" {} ", self.words).contains(&format!(" {} ", pattern))
        } else {
            self.compact.contains(&needle)
        }
    }
}

fn compact(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

fn find_header(field: ColumnField, headers: &[HeaderKey], claimed: &[bool]) -> Option<usize> {
    field.patterns().iter().find_map(|pattern| {
        headers
            .iter()
            .enumerate()
            .find(|(idx, header)| !claimed[*idx] && header.matches(pattern))
            .map(|(idx, _)| idx)
    })
}

/// Cabeçalho livre mais parecido com algum padrão do campo.
fn suggest_header(field: ColumnField, headers: &[Cell], claimed: &[bool]) -> Option<String> {
    let mut best: Option<(f64, String)> = None;

    for (idx, cell) in headers.iter().enumerate() {
        if claimed.get(idx).copied().unwrap_or(false) {
            continue;
        }
        let original = cell.as_text();
        let candidate = header_words(&original);
        if candidate.is_empty() {
            continue;
        }
        for pattern in field.patterns() {
            let score = jaro_winkler(&candidate, pattern) * 0.7
                + normalized_levenshtein(&candidate, pattern) * 0.3;
            if score >= SUGGESTION_THRESHOLD && best.as_ref().map_or(true, |(s, _)| score > *s) {
                best = Some((score, original.clone()));
            }
        }
    }

    best.map(|(_, header)| header)
}
