use serde::Serialize;

use crate::config::{FormState, GraphType};
use crate::session::UiSession;

/// Options of one select control
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Selector {
    /// Text of the empty first option; `None` for multi-selects
    pub placeholder: Option<String>,

    /// Selectable values, in the order the server reported them
    pub options: Vec<String>,
}

impl Selector {
    fn single(label: &str, options: &[String]) -> Self {
        Selector {
            placeholder: Some(format!("Select {}", label)),
            options: options.to_vec(),
        }
    }

    fn multi(options: &[String]) -> Self {
        Selector {
            placeholder: None,
            options: options.to_vec(),
        }
    }
}

/// Visibility of every field group in the configuration panel, plus the
/// option lists of its selectors.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct PanelLayout {
    pub instructions: bool,
    pub column_selection: bool,
    pub styling: bool,
    pub axis_range: bool,
    pub scatter_map: bool,
    /// The y2 column selector, y2 title and y2 bounds
    pub second_axis: bool,

    pub x_column: Selector,
    pub y_columns: Selector,
    pub y2_columns: Selector,

    pub latitude_column: Selector,
    pub longitude_column: Selector,
    pub hover_columns: Selector,
    pub color_column: Selector,
    pub size_column: Selector,

    /// Label next to the light/dark toggle
    pub theme_label: &'static str,
}

impl PanelLayout {
    /// Derives the panel from the chart type and the parsed-file summary.
    ///
    /// Pure: calling it again with the same inputs gives the same layout.
    ///
    /// # Arguments
    /// * `graph_type` - Selected chart type, `None` shows only the instructions
    /// * `session` - Supplies the column lists of the current upload
    /// * `light_mode` - State of the theme toggle
    pub fn derive(graph_type: Option<GraphType>, session: &UiSession, light_mode: bool) -> Self {
        let columns = session.columns();
        let numeric = session.numeric_columns();

        let mut layout = PanelLayout {
            x_column: Selector::single("X-Axis Column", columns),
            y_columns: Selector::multi(numeric),
            y2_columns: Selector::multi(numeric),
            theme_label: if light_mode { "Light Mode" } else { "Dark Mode" },
            ..PanelLayout::default()
        };

        let Some(graph_type) = graph_type else {
            layout.instructions = true;
            return layout;
        };

        if graph_type.is_map() {
            layout.scatter_map = true;
            layout.latitude_column = Selector::single("Latitude Column", columns);
            layout.longitude_column = Selector::single("Longitude Column", columns);
            layout.hover_columns = Selector::multi(columns);
            layout.color_column = Selector::single("Color Column (Optional)", columns);
            layout.size_column = Selector::single("Size Column (Optional)", columns);
        } else {
            layout.column_selection = true;
            layout.styling = true;
            layout.axis_range = true;
            layout.second_axis = graph_type.is_dual_axis();
        }

        layout
    }

    /// Shorthand for deriving from a live form.
    pub fn for_form(form: &FormState, session: &UiSession) -> Self {
        Self::derive(form.graph_type, session, form.light_mode)
    }

    /// True when any of the standard axis groups is showing
    pub fn shows_standard_fields(&self) -> bool {
        self.column_selection || self.styling || self.axis_range
    }
}
