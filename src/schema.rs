/// Column-name and label constants for the OD survey.
/// Single source of truth - exported to Python via PyO3.

// ── Source columns (survey partition encoding) ──────────────────────────────
pub mod source {
    pub const ORIGIN: &str = "origen";
    pub const DESTINATION: &str = "destino";
    pub const MODE: &str = "modo";
    pub const PERIOD: &str = "periodo";
    pub const TRIPS: &str = "viajes";
    pub const PROFESSIONAL: &str = "profesional";
    pub const RESIDENCE: &str = "residencia";

    /// Declared partition schema, excluding the leading row-index column.
    pub const ALL: [&str; 7] = [
        ORIGIN,
        DESTINATION,
        MODE,
        PERIOD,
        TRIPS,
        PROFESSIONAL,
        RESIDENCE,
    ];
}

// ── Unified trip table columns ──────────────────────────────────────────────
pub mod trip {
    pub const ORIGIN: &str = "origin";
    pub const DESTINATION: &str = "destination";
    pub const MODE: &str = "mode";
    pub const PERIOD: &str = "period";
    pub const TRIPS: &str = "trips";

    pub const ALL: [&str; 5] = [ORIGIN, DESTINATION, MODE, PERIOD, TRIPS];
}

// ── Mode labels ─────────────────────────────────────────────────────────────
pub mod mode {
    pub const PRIVATE: &str = "Privado";
    pub const PUBLIC_TRANSPORT: &str = "Transporte Publico";
    pub const NON_MOTORIZED: &str = "No Motorizado";

    /// Abbreviation the survey uses for public transport.
    pub const PUBLIC_TRANSPORT_ABBREV: &str = "TP";

    pub const ALL: [&str; 3] = [PRIVATE, PUBLIC_TRANSPORT, NON_MOTORIZED];
}

// ── Period encoding ─────────────────────────────────────────────────────────
pub mod period {
    pub const MIN_HOUR: i64 = 0;
    pub const MAX_HOUR: i64 = 23;
}
