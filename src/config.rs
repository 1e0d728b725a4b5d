use crate::error::{Error, Result};
use crate::units::parse_unit_expression;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

const DEFAULT_LINE_COLOR: &str = "lightblue";
const DEFAULT_LINE_STROKE: &str = "0.01px";
const DEFAULT_POINT_RADIUS: &str = "1px";
const DEFAULT_POINT_STROKE: &str = "0.1px";
const DEFAULT_POINT_FILL: &str = "black";
const DEFAULT_POINT_STROKE_COLOR: &str = "red";
const DEFAULT_MAX_RADIUS: &str = "0.1px";

fn parse_choice<T: Copy>(option: &'static str, value: &str, table: &[(&str, T)]) -> Result<T> {
    table
        .iter()
        .find(|(token, _)| *token == value)
        .map(|(_, choice)| *choice)
        .ok_or_else(|| {
            let valid: Vec<&str> = table.iter().map(|(token, _)| *token).collect();
            Error::invalid_option(option, value, &valid)
        })
}

fn parse_length(option: &'static str, value: &str) -> Result<f64> {
    parse_unit_expression(value)
        .map(|length| length.to_px())
        .ok_or_else(|| Error::InvalidUnit {
            option,
            value: value.to_string(),
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperationMode {
    #[default]
    Connect,
    Clean,
    AddBuilding,
}

impl OperationMode {
    const CHOICES: &'static [(&'static str, Self)] = &[
        ("connect", Self::Connect),
        ("clean", Self::Clean),
        ("add_building", Self::AddBuilding),
        ("add-building", Self::AddBuilding),
    ];
}

impl FromStr for OperationMode {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        parse_choice("operation mode", &value.to_ascii_lowercase(), Self::CHOICES)
    }
}

/// Which endpoint(s) of a generated line get their point's own transform applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CopyTransform {
    CopyFromA,
    CopyFromB,
    CopyFromBoth,
    #[default]
    NoCopy,
}

impl CopyTransform {
    const CHOICES: &'static [(&'static str, Self)] = &[
        ("copy_from_a", Self::CopyFromA),
        ("copy_from_b", Self::CopyFromB),
        ("copy_from_both", Self::CopyFromBoth),
        ("no_copy", Self::NoCopy),
    ];

    pub fn applies_to_a(&self) -> bool {
        matches!(self, Self::CopyFromA | Self::CopyFromBoth)
    }

    pub fn applies_to_b(&self) -> bool {
        matches!(self, Self::CopyFromB | Self::CopyFromBoth)
    }
}

impl FromStr for CopyTransform {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        parse_choice("copy_transform", value, Self::CHOICES)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    #[default]
    None,
    ByXCenter,
    ByYCenter,
}

impl SortMode {
    const CHOICES: &'static [(&'static str, Self)] = &[
        ("no_sort", Self::None),
        ("none", Self::None),
        ("sort_horizontally", Self::ByXCenter),
        ("by_x_center", Self::ByXCenter),
        ("sort_vertically", Self::ByYCenter),
        ("by_y_center", Self::ByYCenter),
    ];
}

impl FromStr for SortMode {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        parse_choice("sort_mode", value, Self::CHOICES)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    const CHOICES: &'static [(&'static str, Self)] = &[
        ("asc", Self::Ascending),
        ("ascending", Self::Ascending),
        ("desc", Self::Descending),
        ("descending", Self::Descending),
    ];
}

impl FromStr for SortDirection {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        parse_choice("sort_direction", value, Self::CHOICES)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortOptions {
    pub mode: SortMode,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectOptions {
    pub draw_lines: bool,
    pub line_color: String,
    /// Stroke width in user units.
    pub line_stroke_width: f64,
    pub copy_transform: CopyTransform,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            draw_lines: true,
            line_color: DEFAULT_LINE_COLOR.to_string(),
            line_stroke_width: 0.01,
            copy_transform: CopyTransform::NoCopy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanOptions {
    pub clean_lines: bool,
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self { clean_lines: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SmartConnectKind {
    #[default]
    NearestPoint,
}

impl FromStr for SmartConnectKind {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        parse_choice(
            "smart_connect_type",
            value,
            &[("nearest_point", Self::NearestPoint)],
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SmartConnectOptions {
    pub enabled: bool,
    pub kind: SmartConnectKind,
    pub ignore_building_point: bool,
    pub max_radius: f64,
}

impl Default for SmartConnectOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            kind: SmartConnectKind::NearestPoint,
            ignore_building_point: true,
            max_radius: 0.1,
        }
    }
}

/// Built-in building categories. Values follow `<type>[-<subtype>]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildingType {
    #[default]
    Shop,
    Parking,
    AtmMachine,
    ToiletMale,
    ToiletFemale,
    ToiletMaternity,
    SimpleStairs,
    FireEscapeStairs,
    EscalatorStairs,
    ElevatorStairs,
}

impl BuildingType {
    pub fn canonical(&self) -> &'static str {
        match self {
            Self::Shop => "shop",
            Self::Parking => "parking",
            Self::AtmMachine => "atmmachine",
            Self::ToiletMale => "toilet-male",
            Self::ToiletFemale => "toilet-female",
            Self::ToiletMaternity => "toilet-maternity",
            Self::SimpleStairs => "simple-stairs",
            Self::FireEscapeStairs => "fireescape-stairs",
            Self::EscalatorStairs => "escalator-stairs",
            Self::ElevatorStairs => "elevator-stairs",
        }
    }

    /// Splits the canonical value into type and optional subtype.
    pub fn split(&self) -> (&'static str, Option<&'static str>) {
        match self.canonical().split_once('-') {
            Some((kind, subtype)) => (kind, Some(subtype)),
            None => (self.canonical(), None),
        }
    }

    const ALL: [Self; 10] = [
        Self::Shop,
        Self::Parking,
        Self::AtmMachine,
        Self::ToiletMale,
        Self::ToiletFemale,
        Self::ToiletMaternity,
        Self::SimpleStairs,
        Self::FireEscapeStairs,
        Self::EscalatorStairs,
        Self::ElevatorStairs,
    ];

    // spellings written by older configs
    const LEGACY: &'static [(&'static str, Self)] = &[
        ("toilet-mathernity", Self::ToiletMaternity),
        ("simple-stais", Self::SimpleStairs),
        ("fire_escape-stais", Self::FireEscapeStairs),
        ("fire_escape-stairs", Self::FireEscapeStairs),
    ];

    fn lookup(value: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.canonical() == value)
            .or_else(|| {
                Self::LEGACY
                    .iter()
                    .find(|(token, _)| *token == value)
                    .map(|(_, t)| *t)
            })
    }
}

/// The type/subtype written into new building ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildingKind {
    Preset(BuildingType),
    Custom {
        kind: String,
        subtype: Option<String>,
    },
}

impl Default for BuildingKind {
    fn default() -> Self {
        Self::Preset(BuildingType::default())
    }
}

impl BuildingKind {
    /// Validates `building_type` plus the custom fields used when it is `custom`.
    pub fn from_options(
        building_type: &str,
        custom_type: Option<&str>,
        custom_subtype: Option<&str>,
    ) -> Result<Self> {
        if building_type != "custom" {
            return BuildingType::lookup(building_type)
                .map(Self::Preset)
                .ok_or_else(|| {
                    let mut valid: Vec<&str> =
                        BuildingType::ALL.iter().map(|t| t.canonical()).collect();
                    valid.push("custom");
                    Error::invalid_option("building_type", building_type, &valid)
                });
        }
        let kind = custom_type.filter(|s| !s.is_empty()).ok_or_else(|| {
            Error::invalid_option("custom_type", "", &["a letters-only type name"])
        })?;
        if kind == "point" || !crate::ids::is_valid_building_segment(kind) {
            return Err(Error::invalid_option(
                "custom_type",
                kind,
                &["letters only, not \"point\""],
            ));
        }
        let subtype = match custom_subtype.filter(|s| !s.is_empty()) {
            Some(sub) if crate::ids::is_valid_building_segment(sub) => Some(sub.to_string()),
            Some(sub) => {
                return Err(Error::invalid_option(
                    "custom_subtype",
                    sub,
                    &["letters only"],
                ));
            }
            None => None,
        };
        Ok(Self::Custom {
            kind: kind.to_string(),
            subtype,
        })
    }

    pub fn type_and_subtype(&self) -> (String, Option<String>) {
        match self {
            Self::Preset(preset) => {
                let (kind, subtype) = preset.split();
                (kind.to_string(), subtype.map(str::to_string))
            }
            Self::Custom { kind, subtype } => (kind.clone(), subtype.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnchorPosition {
    UpperLeft,
    UpperCenter,
    UpperRight,
    CenterLeft,
    #[default]
    Center,
    CenterRight,
    LowerLeft,
    LowerCenter,
    LowerRight,
}

impl AnchorPosition {
    pub const ALL: [Self; 9] = [
        Self::UpperLeft,
        Self::UpperCenter,
        Self::UpperRight,
        Self::CenterLeft,
        Self::Center,
        Self::CenterRight,
        Self::LowerLeft,
        Self::LowerCenter,
        Self::LowerRight,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UpperLeft => "upper-left",
            Self::UpperCenter => "upper-center",
            Self::UpperRight => "upper-right",
            Self::CenterLeft => "center-left",
            Self::Center => "center",
            Self::CenterRight => "center-right",
            Self::LowerLeft => "lower-left",
            Self::LowerCenter => "lower-center",
            Self::LowerRight => "lower-right",
        }
    }
}

impl FromStr for AnchorPosition {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        let normalized = value.replace('_', "-");
        Self::ALL
            .iter()
            .copied()
            .find(|anchor| anchor.as_str() == normalized)
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(|a| a.as_str()).collect();
                Error::invalid_option("building_point_position", value, &valid)
            })
    }
}

/// How far an entrance sits from the building border.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Separation {
    CenterToCenter,
    BorderToBorderIn,
    #[default]
    BorderToBorderOut,
    TenPercentIn,
    TenPercentOut,
    Custom(String),
}

impl Separation {
    const CHOICES: &'static [(&'static str, Self)] = &[
        ("center-to-center", Self::CenterToCenter),
        ("border-to-border-in", Self::BorderToBorderIn),
        ("border-to-border-out", Self::BorderToBorderOut),
        ("border-to-boder-out", Self::BorderToBorderOut),
        ("10%-to-border-in", Self::TenPercentIn),
        ("10%-to-border-out", Self::TenPercentOut),
    ];

    pub fn from_options(value: &str, custom_separation: Option<&str>) -> Result<Self> {
        let normalized = value.replace('_', "-");
        if normalized == "custom" {
            let spec = custom_separation.filter(|s| !s.is_empty()).ok_or_else(|| {
                Error::invalid_option("custom_point_separation", "", &["a separation expression"])
            })?;
            return Ok(Self::Custom(spec.to_string()));
        }
        Self::CHOICES
            .iter()
            .find(|(token, _)| *token == normalized)
            .map(|(_, choice)| choice.clone())
            .ok_or_else(|| {
                let mut valid: Vec<&str> = Self::CHOICES.iter().map(|(token, _)| *token).collect();
                valid.push("custom");
                Error::invalid_option("point_to_border_separation", value, &valid)
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Placement {
    pub anchor: AnchorPosition,
    pub separation: Separation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildingOptions {
    pub kind: BuildingKind,
    /// `None` when buildings are tagged without creating an entrance point.
    pub connection_point: Option<Placement>,
}

impl Default for BuildingOptions {
    fn default() -> Self {
        Self {
            kind: BuildingKind::default(),
            connection_point: Some(Placement::default()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntranceOptions {
    pub radius: f64,
    pub fill_color: String,
    pub stroke_color: String,
    pub stroke_width: f64,
}

impl Default for EntranceOptions {
    fn default() -> Self {
        Self {
            radius: 1.0,
            fill_color: DEFAULT_POINT_FILL.to_string(),
            stroke_color: DEFAULT_POINT_STROKE_COLOR.to_string(),
            stroke_width: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Config {
    pub mode: OperationMode,
    /// Processing order for both connect and add-building selections.
    pub sort: SortOptions,
    pub connect: ConnectOptions,
    pub clean: CleanOptions,
    pub building: BuildingOptions,
    pub entrance: EntranceOptions,
    pub smart_connect: SmartConnectOptions,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ConnectConfigFile {
    draw_lines: Option<bool>,
    line_color: Option<String>,
    line_stroke_width: Option<String>,
    copy_transform: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct CleanConfigFile {
    clean_lines: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct SortConfigFile {
    mode: Option<String>,
    direction: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct BuildingConfigFile {
    building_type: Option<String>,
    custom_type: Option<String>,
    custom_subtype: Option<String>,
    add_connection_point: Option<bool>,
    building_point_position: Option<String>,
    point_to_border_separation: Option<String>,
    custom_point_separation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct EntranceConfigFile {
    point_radius: Option<String>,
    point_fill_color: Option<String>,
    point_stroke: Option<String>,
    point_stroke_color: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct SmartConnectConfigFile {
    enabled: Option<bool>,
    #[serde(rename = "type")]
    kind: Option<String>,
    ignore_building_point: Option<bool>,
    max_radius: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    operation_mode: Option<String>,
    connect: Option<ConnectConfigFile>,
    clean: Option<CleanConfigFile>,
    sort: Option<SortConfigFile>,
    building: Option<BuildingConfigFile>,
    entrance: Option<EntranceConfigFile>,
    smart_connect: Option<SmartConnectConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parses a JSON5 config and validates every option; the first invalid value aborts.
pub fn parse_config(contents: &str) -> Result<Config> {
    let parsed: ConfigFile =
        json5::from_str(contents).map_err(|e| Error::Config(e.to_string()))?;
    let mut config = Config::default();

    if let Some(mode) = parsed.operation_mode {
        config.mode = mode.parse()?;
    }

    if let Some(sort) = parsed.sort {
        if let Some(v) = sort.mode {
            config.sort.mode = v.parse()?;
        }
        if let Some(v) = sort.direction {
            config.sort.direction = v.parse()?;
        }
    }

    let connect = parsed.connect.unwrap_or_default();
    if let Some(v) = connect.draw_lines {
        config.connect.draw_lines = v;
    }
    if let Some(v) = connect.line_color {
        config.connect.line_color = v;
    }
    config.connect.line_stroke_width = parse_length(
        "line_stroke_width",
        connect.line_stroke_width.as_deref().unwrap_or(DEFAULT_LINE_STROKE),
    )?;
    if let Some(v) = connect.copy_transform {
        config.connect.copy_transform = v.parse()?;
    }

    if let Some(clean) = parsed.clean {
        if let Some(v) = clean.clean_lines {
            config.clean.clean_lines = v;
        }
    }

    let building = parsed.building.unwrap_or_default();
    config.building.kind = BuildingKind::from_options(
        building.building_type.as_deref().unwrap_or("shop"),
        building.custom_type.as_deref(),
        building.custom_subtype.as_deref(),
    )?;
    config.building.connection_point = if building.add_connection_point.unwrap_or(true) {
        let anchor = match building.building_point_position.as_deref() {
            Some(v) => v.parse()?,
            None => AnchorPosition::default(),
        };
        let separation = match building.point_to_border_separation.as_deref() {
            Some(v) => Separation::from_options(v, building.custom_point_separation.as_deref())?,
            None => Separation::default(),
        };
        Some(Placement { anchor, separation })
    } else {
        None
    };

    let entrance = parsed.entrance.unwrap_or_default();
    config.entrance.radius = parse_length(
        "point_radius",
        entrance.point_radius.as_deref().unwrap_or(DEFAULT_POINT_RADIUS),
    )?;
    config.entrance.stroke_width = parse_length(
        "point_stroke",
        entrance.point_stroke.as_deref().unwrap_or(DEFAULT_POINT_STROKE),
    )?;
    if let Some(v) = entrance.point_fill_color {
        config.entrance.fill_color = v;
    }
    if let Some(v) = entrance.point_stroke_color {
        config.entrance.stroke_color = v;
    }

    let smart = parsed.smart_connect.unwrap_or_default();
    if let Some(v) = smart.enabled {
        config.smart_connect.enabled = v;
    }
    if let Some(v) = smart.kind {
        config.smart_connect.kind = v.parse()?;
    }
    if let Some(v) = smart.ignore_building_point {
        config.smart_connect.ignore_building_point = v;
    }
    config.smart_connect.max_radius = parse_length(
        "max_radius",
        smart.max_radius.as_deref().unwrap_or(DEFAULT_MAX_RADIUS),
    )?;

    Ok(config)
}
