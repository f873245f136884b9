//! The upload/render controller: turns user triggers into endpoint calls,
//! session updates and view changes.

use crate::api::ChartApi;
use crate::config::{FormState, GraphType, ValidationError};
use crate::notify::{Notifier, Severity, Toast};
use crate::panel::PanelLayout;
use crate::render::{ChartSpec, DownloadOptions, RenderRequest};
use crate::session::{UiSession, ViewState};
use crate::upload::{SelectedFile, UploadOutcome, check_extension, size_advisories};

/// Presentation surface driven by the controller.
///
/// A browser page, a terminal or a test recorder can sit behind it; the
/// controller never reads from it, all input arrives through the `on_*`
/// methods and [`Controller::form_mut`].
pub trait View {
    /// Shows the panels belonging to `state`.
    fn show_view_state(&mut self, state: ViewState);

    /// Shows or hides the loading overlay.
    fn set_loading(&mut self, loading: bool);

    /// Applies field-group visibility and selector options.
    fn apply_layout(&mut self, layout: &PanelLayout);

    /// Displays a transient notification.
    fn show_toast(&mut self, toast: &Toast);

    /// Draws `chart`, replacing whatever chart was shown before.
    fn render_chart(&mut self, chart: &ChartSpec);

    /// Saves the displayed chart as an image.
    fn download_chart(&mut self, chart: &ChartSpec, options: &DownloadOptions);

    /// Re-lays the displayed chart out to fill the available space.
    fn fullscreen_chart(&mut self, chart: &ChartSpec);

    /// Puts every form control back to the values in `form`.
    fn reset_form(&mut self, form: &FormState);
}

/// Result of a trigger, for callers that need more than the notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    Failed,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Succeeded)
    }
}

/// Owns the session and the form, and mediates between a [`ChartApi`] and
/// a [`View`].
///
/// Every trigger takes `&mut self`, so one upload or render must settle
/// before the next can start.
pub struct Controller<A, V> {
    api: A,
    view: V,
    session: UiSession,
    form: FormState,
    notifier: Notifier,
}

impl<A: ChartApi, V: View> Controller<A, V> {
    pub fn new(api: A, view: V) -> Self {
        Controller {
            api,
            view,
            session: UiSession::new(),
            form: FormState::initial(),
            notifier: Notifier::new(),
        }
    }

    pub fn session(&self) -> &UiSession {
        &self.session
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    /// Mutable access for views that write control values back.
    pub fn form_mut(&mut self) -> &mut FormState {
        &mut self.form
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    fn notify(&mut self, message: impl Into<String>, severity: Severity) {
        let toast = self.notifier.notify(message, severity);
        self.view.show_toast(&toast);
    }

    /// Current panel layout, re-derived from the form and the session.
    pub fn layout(&self) -> PanelLayout {
        PanelLayout::for_form(&self.form, &self.session)
    }

    /// Re-derives the configuration panel and hands it to the view.
    pub fn refresh_layout(&mut self) -> PanelLayout {
        let layout = self.layout();
        self.view.apply_layout(&layout);
        layout
    }

    /// Uploads a file the user selected or dropped.
    ///
    /// Disallowed extensions are refused before any request is made. Large
    /// files only produce advisories.
    ///
    /// # Arguments
    /// * `file` - The selected file
    ///
    /// # Returns
    /// * `Outcome` - Whether the file was accepted; details went to the notifications
    pub async fn on_file_selected(&mut self, file: SelectedFile) -> Outcome {
        if let Err(message) = check_extension(&file.name) {
            self.notify(message, Severity::Error);
            return Outcome::Failed;
        }

        for advisory in size_advisories(file.size) {
            self.notify(advisory, Severity::Warning);
        }

        self.view.set_loading(true);
        let result = self.api.upload(&file).await;
        self.view.set_loading(false);

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                self.notify(format!("Error uploading file: {}", e), Severity::Error);
                return Outcome::Failed;
            }
        };

        match response.into_outcome(&file.name) {
            UploadOutcome::Accepted {
                file: reference,
                summary,
                message,
            } => {
                log::debug!(
                    "upload accepted as {} ({})",
                    reference.filename,
                    reference.file_type
                );
                self.session.attach_upload(reference, summary);
                self.form.clear_column_selections();
                self.notify(message, Severity::Success);
                self.view.show_view_state(self.session.view);
                self.refresh_layout();
                Outcome::Succeeded
            }
            UploadOutcome::Refused(error) => {
                self.notify(error, Severity::Error);
                Outcome::Failed
            }
        }
    }

    /// Switches the chart type and re-derives the panel.
    pub fn on_graph_type_changed(&mut self, graph_type: Option<GraphType>) -> PanelLayout {
        self.form.graph_type = graph_type;
        self.refresh_layout()
    }

    /// Flips the light/dark toggle and refreshes its label.
    pub fn on_light_mode_changed(&mut self, light_mode: bool) -> PanelLayout {
        self.form.light_mode = light_mode;
        self.refresh_layout()
    }

    /// Validates the form and asks the server for a chart.
    ///
    /// Validation failures never reach the network. The loading indicator
    /// is cleared however the request settles.
    pub async fn on_generate_requested(&mut self) -> Outcome {
        let config = match self.form.build() {
            Ok(config) => config,
            Err(e) => {
                self.notify(e.to_string(), Severity::Error);
                return Outcome::Failed;
            }
        };

        let Some(filename) = self.session.file.as_ref().map(|f| f.filename.clone()) else {
            self.notify(ValidationError::NoFileUploaded.to_string(), Severity::Error);
            return Outcome::Failed;
        };
        let request = RenderRequest::new(filename, config);

        self.view.set_loading(true);
        let result = self.api.generate(&request).await;
        self.view.set_loading(false);

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                self.notify(format!("Error generating graph: {}", e), Severity::Error);
                return Outcome::Failed;
            }
        };

        if !response.success {
            let error = response
                .error
                .unwrap_or_else(|| "Failed to generate graph".to_string());
            self.notify(error, Severity::Error);
            return Outcome::Failed;
        }

        if let Some(message) = response.message {
            self.notify(message, Severity::Success);
            return Outcome::Succeeded;
        }

        let Some(graph) = response.graph else {
            log::warn!("render succeeded without a message or a graph");
            return Outcome::Succeeded;
        };

        match ChartSpec::from_json(&graph) {
            Ok(chart) => {
                self.view.render_chart(&chart);
                self.session.attach_chart(chart);
                self.view.show_view_state(self.session.view);
                self.notify("Graph generated successfully!", Severity::Success);
                Outcome::Succeeded
            }
            Err(e) => {
                self.notify(format!("Error generating graph: {}", e), Severity::Error);
                Outcome::Failed
            }
        }
    }

    /// Exports the current chart as a PNG through the view.
    pub fn on_download_requested(&mut self) -> Outcome {
        match self.session.chart.as_ref() {
            Some(chart) => {
                self.view.download_chart(chart, &DownloadOptions::default());
                Outcome::Succeeded
            }
            None => {
                self.notify("No graph to download", Severity::Error);
                Outcome::Failed
            }
        }
    }

    pub fn on_fullscreen_requested(&mut self) -> Outcome {
        match self.session.chart.as_ref() {
            Some(chart) => {
                self.view.fullscreen_chart(chart);
                Outcome::Succeeded
            }
            None => {
                self.notify("No graph to display", Severity::Error);
                Outcome::Failed
            }
        }
    }

    /// Forgets the upload and the chart and restores every control default.
    pub fn on_reset(&mut self) {
        self.session.clear();
        self.form = FormState::default();

        self.view.reset_form(&self.form);
        self.view.show_view_state(self.session.view);
        self.refresh_layout();
        self.notify("Application reset successfully", Severity::Success);
    }
}
