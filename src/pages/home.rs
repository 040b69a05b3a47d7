use leptos::prelude::*;
use leptos_router::hooks::use_query_map;

use crate::components::graph_view::{GraphViewer, ViewerConfig};

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	// Query parameters are read once; changing them means reloading the page.
	let query = use_query_map().get_untracked();
	let config = ViewerConfig::from_params(|key| query.get(key));

	view! {
		<ErrorBoundary fallback=|errors| {
			view! {
				<h1>"Uh oh! Something went wrong!"</h1>

				<p>"Errors: "</p>
				<ul>
					{move || {
						errors
							.get()
							.into_iter()
							.map(|(_, e)| view! { <li>{e.to_string()}</li> })
							.collect_view()
					}}
				</ul>
			}
		}>

			<GraphViewer config=config />
		</ErrorBoundary>
	}
}
