//! Tabelas estáticas usadas quando o serviço de mapas não responde.

use super::normalize::normalize_text;
use crate::types::shipment::{GeoPoint, Place};

/// Distância usada quando a UF não é reconhecida (km).
pub const DEFAULT_REGION_DISTANCE_KM: f64 = 500.0;

/// Coordenadas aproximadas de capitais e polos logísticos.
///
/// Nomes já normalizados (caixa alta, sem acento).
const ESTIMATED_COORDINATES: &[(&str, &str, f64, f64)] = &[
    ("RIO BRANCO", "AC", -9.9747, -67.8100),
    ("MACEIO", "AL", -9.6658, -35.7353),
    ("MACAPA", "AP", 0.0349, -51.0694),
    ("MANAUS", "AM", -3.1190, -60.0217),
    ("SALVADOR", "BA", -12.9714, -38.5014),
    ("FEIRA DE SANTANA", "BA", -12.2664, -38.9663),
    ("FORTALEZA", "CE", -3.7319, -38.5267),
    ("BRASILIA", "DF", -15.7939, -47.8828),
    ("VITORIA", "ES", -20.3155, -40.3128),
    ("SERRA", "ES", -20.1286, -40.3078),
    ("GOIANIA", "GO", -16.6869, -49.2648),
    ("ANAPOLIS", "GO", -16.3281, -48.9530),
    ("SAO LUIS", "MA", -2.5297, -44.3028),
    ("CUIABA", "MT", -15.6014, -56.0979),
    ("RONDONOPOLIS", "MT", -16.4673, -54.6372),
    ("CAMPO GRANDE", "MS", -20.4697, -54.6201),
    ("DOURADOS", "MS", -22.2231, -54.8120),
    ("BELO HORIZONTE", "MG", -19.9167, -43.9345),
    ("CONTAGEM", "MG", -19.9320, -44.0539),
    ("UBERLANDIA", "MG", -18.9186, -48.2772),
    ("BELEM", "PA", -1.4558, -48.4902),
    ("JOAO PESSOA", "PB", -7.1195, -34.8450),
    ("CURITIBA", "PR", -25.4284, -49.2733),
    ("LONDRINA", "PR", -23.3045, -51.1696),
    ("MARINGA", "PR", -23.4205, -51.9333),
    ("PARANAGUA", "PR", -25.5161, -48.5225),
    ("RECIFE", "PE", -8.0476, -34.8770),
    ("TERESINA", "PI", -5.0920, -42.8038),
    ("RIO DE JANEIRO", "RJ", -22.9068, -43.1729),
    ("DUQUE DE CAXIAS", "RJ", -22.7856, -43.3117),
    ("NATAL", "RN", -5.7945, -35.2110),
    ("PORTO ALEGRE", "RS", -30.0346, -51.2177),
    ("CAXIAS DO SUL", "RS", -29.1678, -51.1794),
    ("PORTO VELHO", "RO", -8.7612, -63.9004),
    ("BOA VISTA", "RR", 2.8235, -60.6758),
    ("FLORIANOPOLIS", "SC", -27.5954, -48.5480),
    ("JOINVILLE", "SC", -26.3045, -48.8487),
    ("ITAJAI", "SC", -26.9078, -48.6619),
    ("SAO PAULO", "SP", -23.5505, -46.6333),
    ("CAMPINAS", "SP", -22.9099, -47.0626),
    ("SANTOS", "SP", -23.9608, -46.3336),
    ("GUARULHOS", "SP", -23.4543, -46.5337),
    ("JUNDIAI", "SP", -23.1857, -46.8978),
    ("SOROCABA", "SP", -23.5015, -47.4526),
    ("RIBEIRAO PRETO", "SP", -21.1704, -47.8103),
    ("SAO JOSE DOS CAMPOS", "SP", -23.2237, -45.9009),
    ("ARACAJU", "SE", -10.9472, -37.0731),
    ("PALMAS", "TO", -10.1840, -48.3336),
];

/// Distância rodoviária média por UF de destino (km).
const STATE_AVERAGE_DISTANCE_KM: &[(&str, f64)] = &[
    ("AC", 3500.0),
    ("AL", 2300.0),
    ("AM", 3900.0),
    ("AP", 3300.0),
    ("BA", 1900.0),
    ("CE", 3000.0),
    ("DF", 1000.0),
    ("ES", 900.0),
    ("GO", 900.0),
    ("MA", 2900.0),
    ("MG", 600.0),
    ("MS", 1000.0),
    ("MT", 1600.0),
    ("PA", 2900.0),
    ("PB", 2700.0),
    ("PE", 2600.0),
    ("PI", 2800.0),
    ("PR", 500.0),
    ("RJ", 450.0),
    ("RN", 2900.0),
    ("RO", 3000.0),
    ("RR", 4700.0),
    ("RS", 1100.0),
    ("SC", 700.0),
    ("SE", 2100.0),
    ("SP", 300.0),
    ("TO", 1800.0),
];

/// Coordenada estimada para a cidade, se conhecida.
///
/// Sem UF, a primeira cidade com o mesmo nome é usada.
pub fn estimated_coordinates(place: &Place) -> Option<(GeoPoint, String)> {
    let city = normalize_text(&place.city);
    let state = normalize_text(&place.state);

    ESTIMATED_COORDINATES
        .iter()
        .find(|(c, uf, _, _)| *c == city && (state.is_empty() || *uf == state))
        .map(|(c, uf, lat, lon)| (GeoPoint::new(*lat, *lon), format!("{}/{}", c, uf)))
}

/// Distância média para a UF, se reconhecida.
pub fn state_average_distance(state: &str) -> Option<f64> {
    let state = normalize_text(state);
    STATE_AVERAGE_DISTANCE_KM
        .iter()
        .find(|(uf, _)| *uf == state)
        .map(|(_, km)| *km)
}
