//! Autoshape and connector catalog
//!
//! Maps the MSO_SHAPE style names clients send (`RECTANGLE`,
//! `FLOWCHART_DECISION`, ...) to DrawingML preset geometry and the display
//! label used when naming new shapes.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde::Serialize;

use crate::errors::{Result, ServerError};

/// One autoshape type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShapeType {
    /// Client-facing name, upper snake case
    pub name: &'static str,
    /// `prst` value of `a:prstGeom`
    pub preset: &'static str,
    /// Base of generated shape names ("Rectangle 3")
    pub label: &'static str,
}

macro_rules! shapes {
    ($(($name:literal, $preset:literal, $label:literal)),* $(,)?) => {
        &[$(ShapeType { name: $name, preset: $preset, label: $label }),*]
    };
}

/// Every supported autoshape
pub static SHAPE_TYPES: &[ShapeType] = shapes![
    ("RECTANGLE", "rect", "Rectangle"),
    ("ROUNDED_RECTANGLE", "roundRect", "Rounded Rectangle"),
    ("SNIP_1_RECTANGLE", "snip1Rect", "Snip Single Corner Rectangle"),
    ("SNIP_2_SAME_RECTANGLE", "snip2SameRect", "Snip Same Side Corner Rectangle"),
    ("ROUND_1_RECTANGLE", "round1Rect", "Round Single Corner Rectangle"),
    ("ROUND_2_SAME_RECTANGLE", "round2SameRect", "Round Same Side Corner Rectangle"),
    ("OVAL", "ellipse", "Oval"),
    ("ISOSCELES_TRIANGLE", "triangle", "Isosceles Triangle"),
    ("RIGHT_TRIANGLE", "rtTriangle", "Right Triangle"),
    ("PARALLELOGRAM", "parallelogram", "Parallelogram"),
    ("TRAPEZOID", "trapezoid", "Trapezoid"),
    ("DIAMOND", "diamond", "Diamond"),
    ("REGULAR_PENTAGON", "pentagon", "Regular Pentagon"),
    ("HEXAGON", "hexagon", "Hexagon"),
    ("HEPTAGON", "heptagon", "Heptagon"),
    ("OCTAGON", "octagon", "Octagon"),
    ("DECAGON", "decagon", "Decagon"),
    ("DODECAGON", "dodecagon", "Dodecagon"),
    ("PIE", "pie", "Pie"),
    ("CHORD", "chord", "Chord"),
    ("TEAR", "teardrop", "Teardrop"),
    ("FRAME", "frame", "Frame"),
    ("HALF_FRAME", "halfFrame", "Half Frame"),
    ("CORNER", "corner", "L-Shape"),
    ("DIAGONAL_STRIPE", "diagStripe", "Diagonal Stripe"),
    ("CROSS", "plus", "Cross"),
    ("PLAQUE", "plaque", "Plaque"),
    ("CAN", "can", "Can"),
    ("CUBE", "cube", "Cube"),
    ("BEVEL", "bevel", "Bevel"),
    ("DONUT", "donut", "Donut"),
    ("NO_SYMBOL", "noSmoking", "\"No\" Symbol"),
    ("BLOCK_ARC", "blockArc", "Block Arc"),
    ("FOLDED_CORNER", "foldedCorner", "Folded Corner"),
    ("SMILEY_FACE", "smileyFace", "Smiley Face"),
    ("HEART", "heart", "Heart"),
    ("LIGHTNING_BOLT", "lightningBolt", "Lightning Bolt"),
    ("SUN", "sun", "Sun"),
    ("MOON", "moon", "Moon"),
    ("CLOUD", "cloud", "Cloud"),
    ("ARC", "arc", "Arc"),
    ("DOUBLE_BRACKET", "bracketPair", "Double Bracket"),
    ("DOUBLE_BRACE", "bracePair", "Double Brace"),
    ("LEFT_BRACKET", "leftBracket", "Left Bracket"),
    ("RIGHT_BRACKET", "rightBracket", "Right Bracket"),
    ("LEFT_BRACE", "leftBrace", "Left Brace"),
    ("RIGHT_BRACE", "rightBrace", "Right Brace"),
    // Block arrows
    ("RIGHT_ARROW", "rightArrow", "Right Arrow"),
    ("LEFT_ARROW", "leftArrow", "Left Arrow"),
    ("UP_ARROW", "upArrow", "Up Arrow"),
    ("DOWN_ARROW", "downArrow", "Down Arrow"),
    ("LEFT_RIGHT_ARROW", "leftRightArrow", "Left-Right Arrow"),
    ("UP_DOWN_ARROW", "upDownArrow", "Up-Down Arrow"),
    ("QUAD_ARROW", "quadArrow", "Quad Arrow"),
    ("LEFT_RIGHT_UP_ARROW", "leftRightUpArrow", "Left-Right-Up Arrow"),
    ("BENT_ARROW", "bentArrow", "Bent Arrow"),
    ("U_TURN_ARROW", "uturnArrow", "U-Turn Arrow"),
    ("LEFT_UP_ARROW", "leftUpArrow", "Left-Up Arrow"),
    ("BENT_UP_ARROW", "bentUpArrow", "Bent-Up Arrow"),
    ("CURVED_RIGHT_ARROW", "curvedRightArrow", "Curved Right Arrow"),
    ("CURVED_LEFT_ARROW", "curvedLeftArrow", "Curved Left Arrow"),
    ("CURVED_UP_ARROW", "curvedUpArrow", "Curved Up Arrow"),
    ("CURVED_DOWN_ARROW", "curvedDownArrow", "Curved Down Arrow"),
    ("STRIPED_RIGHT_ARROW", "stripedRightArrow", "Striped Right Arrow"),
    ("NOTCHED_RIGHT_ARROW", "notchedRightArrow", "Notched Right Arrow"),
    ("PENTAGON", "homePlate", "Pentagon"),
    ("CHEVRON", "chevron", "Chevron"),
    ("RIGHT_ARROW_CALLOUT", "rightArrowCallout", "Right Arrow Callout"),
    ("LEFT_ARROW_CALLOUT", "leftArrowCallout", "Left Arrow Callout"),
    ("UP_ARROW_CALLOUT", "upArrowCallout", "Up Arrow Callout"),
    ("DOWN_ARROW_CALLOUT", "downArrowCallout", "Down Arrow Callout"),
    ("CIRCULAR_ARROW", "circularArrow", "Circular Arrow"),
    // Equation shapes
    ("MATH_PLUS", "mathPlus", "Plus"),
    ("MATH_MINUS", "mathMinus", "Minus"),
    ("MATH_MULTIPLY", "mathMultiply", "Multiply"),
    ("MATH_DIVIDE", "mathDivide", "Division"),
    ("MATH_EQUAL", "mathEqual", "Equal"),
    ("MATH_NOT_EQUAL", "mathNotEqual", "Not Equal"),
    // Flowchart
    ("FLOWCHART_PROCESS", "flowChartProcess", "Flowchart: Process"),
    ("FLOWCHART_ALTERNATE_PROCESS", "flowChartAlternateProcess", "Flowchart: Alternate Process"),
    ("FLOWCHART_DECISION", "flowChartDecision", "Flowchart: Decision"),
    ("FLOWCHART_DATA", "flowChartInputOutput", "Flowchart: Data"),
    ("FLOWCHART_PREDEFINED_PROCESS", "flowChartPredefinedProcess", "Flowchart: Predefined Process"),
    ("FLOWCHART_INTERNAL_STORAGE", "flowChartInternalStorage", "Flowchart: Internal Storage"),
    ("FLOWCHART_DOCUMENT", "flowChartDocument", "Flowchart: Document"),
    ("FLOWCHART_MULTIDOCUMENT", "flowChartMultidocument", "Flowchart: Multidocument"),
    ("FLOWCHART_TERMINATOR", "flowChartTerminator", "Flowchart: Terminator"),
    ("FLOWCHART_PREPARATION", "flowChartPreparation", "Flowchart: Preparation"),
    ("FLOWCHART_MANUAL_INPUT", "flowChartManualInput", "Flowchart: Manual Input"),
    ("FLOWCHART_MANUAL_OPERATION", "flowChartManualOperation", "Flowchart: Manual Operation"),
    ("FLOWCHART_CONNECTOR", "flowChartConnector", "Flowchart: Connector"),
    ("FLOWCHART_OFFPAGE_CONNECTOR", "flowChartOffpageConnector", "Flowchart: Off-page Connector"),
    ("FLOWCHART_CARD", "flowChartPunchedCard", "Flowchart: Card"),
    ("FLOWCHART_PUNCHED_TAPE", "flowChartPunchedTape", "Flowchart: Punched Tape"),
    ("FLOWCHART_SUMMING_JUNCTION", "flowChartSummingJunction", "Flowchart: Summing Junction"),
    ("FLOWCHART_OR", "flowChartOr", "Flowchart: Or"),
    ("FLOWCHART_COLLATE", "flowChartCollate", "Flowchart: Collate"),
    ("FLOWCHART_SORT", "flowChartSort", "Flowchart: Sort"),
    ("FLOWCHART_EXTRACT", "flowChartExtract", "Flowchart: Extract"),
    ("FLOWCHART_MERGE", "flowChartMerge", "Flowchart: Merge"),
    ("FLOWCHART_STORED_DATA", "flowChartOnlineStorage", "Flowchart: Stored Data"),
    ("FLOWCHART_DELAY", "flowChartDelay", "Flowchart: Delay"),
    ("FLOWCHART_SEQUENTIAL_ACCESS_STORAGE", "flowChartMagneticTape", "Flowchart: Sequential Access Storage"),
    ("FLOWCHART_MAGNETIC_DISK", "flowChartMagneticDisk", "Flowchart: Magnetic Disk"),
    ("FLOWCHART_DIRECT_ACCESS_STORAGE", "flowChartMagneticDrum", "Flowchart: Direct Access Storage"),
    ("FLOWCHART_DISPLAY", "flowChartDisplay", "Flowchart: Display"),
    ("FLOWCHART_OFFLINE_STORAGE", "flowChartOfflineStorage", "Flowchart: Offline Storage"),
    // Stars and banners
    ("EXPLOSION1", "irregularSeal1", "Explosion 1"),
    ("EXPLOSION2", "irregularSeal2", "Explosion 2"),
    ("STAR_4_POINT", "star4", "4-Point Star"),
    ("STAR_5_POINT", "star5", "5-Point Star"),
    ("STAR_6_POINT", "star6", "6-Point Star"),
    ("STAR_7_POINT", "star7", "7-Point Star"),
    ("STAR_8_POINT", "star8", "8-Point Star"),
    ("STAR_10_POINT", "star10", "10-Point Star"),
    ("STAR_12_POINT", "star12", "12-Point Star"),
    ("STAR_16_POINT", "star16", "16-Point Star"),
    ("STAR_24_POINT", "star24", "24-Point Star"),
    ("STAR_32_POINT", "star32", "32-Point Star"),
    ("UP_RIBBON", "ribbon2", "Up Ribbon"),
    ("DOWN_RIBBON", "ribbon", "Down Ribbon"),
    ("CURVED_UP_RIBBON", "ellipseRibbon2", "Curved Up Ribbon"),
    ("CURVED_DOWN_RIBBON", "ellipseRibbon", "Curved Down Ribbon"),
    ("VERTICAL_SCROLL", "verticalScroll", "Vertical Scroll"),
    ("HORIZONTAL_SCROLL", "horizontalScroll", "Horizontal Scroll"),
    ("WAVE", "wave", "Wave"),
    ("DOUBLE_WAVE", "doubleWave", "Double Wave"),
    // Callouts
    ("RECTANGULAR_CALLOUT", "wedgeRectCallout", "Rectangular Callout"),
    ("ROUNDED_RECTANGULAR_CALLOUT", "wedgeRoundRectCallout", "Rounded Rectangular Callout"),
    ("OVAL_CALLOUT", "wedgeEllipseCallout", "Oval Callout"),
    ("CLOUD_CALLOUT", "cloudCallout", "Cloud Callout"),
    ("LINE_CALLOUT_1", "borderCallout1", "Line Callout 1"),
    ("LINE_CALLOUT_2", "borderCallout2", "Line Callout 2"),
    ("LINE_CALLOUT_3", "borderCallout3", "Line Callout 3"),
    ("LINE_CALLOUT_1_NO_BORDER", "callout1", "Line Callout 1 (No Border)"),
    ("LINE_CALLOUT_1_ACCENT_BAR", "accentCallout1", "Line Callout 1 (Accent Bar)"),
    // Action buttons
    ("ACTION_BUTTON_BACK_OR_PREVIOUS", "actionButtonBackPrevious", "Action Button: Back or Previous"),
    ("ACTION_BUTTON_FORWARD_OR_NEXT", "actionButtonForwardNext", "Action Button: Forward or Next"),
    ("ACTION_BUTTON_BEGINNING", "actionButtonBeginning", "Action Button: Beginning"),
    ("ACTION_BUTTON_END", "actionButtonEnd", "Action Button: End"),
    ("ACTION_BUTTON_HOME", "actionButtonHome", "Action Button: Home"),
    ("ACTION_BUTTON_HELP", "actionButtonHelp", "Action Button: Help"),
    ("ACTION_BUTTON_INFORMATION", "actionButtonInformation", "Action Button: Information"),
    ("ACTION_BUTTON_RETURN", "actionButtonReturn", "Action Button: Return"),
    ("ACTION_BUTTON_DOCUMENT", "actionButtonDocument", "Action Button: Document"),
    ("ACTION_BUTTON_SOUND", "actionButtonSound", "Action Button: Sound"),
    ("ACTION_BUTTON_MOVIE", "actionButtonMovie", "Action Button: Movie"),
    ("ACTION_BUTTON_CUSTOM", "actionButtonBlank", "Action Button: Custom"),
];

/// Names listed when a lookup fails
pub const COMMON_SHAPES: &[&str] = &[
    "RECTANGLE",
    "OVAL",
    "ROUNDED_RECTANGLE",
    "DIAMOND",
    "ISOSCELES_TRIANGLE",
    "RIGHT_ARROW",
    "LEFT_ARROW",
    "UP_ARROW",
    "DOWN_ARROW",
    "PENTAGON",
    "HEXAGON",
    "CHEVRON",
    "STAR_5_POINT",
    "FLOWCHART_PROCESS",
    "FLOWCHART_DECISION",
    "FLOWCHART_TERMINATOR",
    "FLOWCHART_DATA",
    "LINE_CALLOUT_1",
];

fn index() -> &'static HashMap<&'static str, &'static ShapeType> {
    static INDEX: OnceLock<HashMap<&'static str, &'static ShapeType>> = OnceLock::new();
    INDEX.get_or_init(|| SHAPE_TYPES.iter().map(|s| (s.name, s)).collect())
}

/// Look up a shape type by name, ignoring case
pub fn shape_type(name: &str) -> Result<&'static ShapeType> {
    let key = name.trim().to_ascii_uppercase();
    index().get(key.as_str()).copied().ok_or_else(|| {
        ServerError::InvalidArgument(format!(
            "Unknown shape type '{}'. Try one of: {}...",
            name,
            COMMON_SHAPES.join(", ")
        ))
    })
}

/// Connector routing styles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConnectorType {
    Straight,
    Elbow,
    Curved,
}

impl ConnectorType {
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "STRAIGHT" => Ok(ConnectorType::Straight),
            "ELBOW" => Ok(ConnectorType::Elbow),
            "CURVED" => Ok(ConnectorType::Curved),
            _ => Err(ServerError::InvalidArgument(format!(
                "Unknown connector type '{}'. Use STRAIGHT, ELBOW or CURVED.",
                name
            ))),
        }
    }

    pub fn preset(self) -> &'static str {
        match self {
            ConnectorType::Straight => "straightConnector1",
            ConnectorType::Elbow => "bentConnector3",
            ConnectorType::Curved => "curvedConnector3",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ConnectorType::Straight => "STRAIGHT",
            ConnectorType::Elbow => "ELBOW",
            ConnectorType::Curved => "CURVED",
        }
    }
}

impl std::fmt::Display for ConnectorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
