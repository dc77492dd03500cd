//! The DOM contract with the admin UI.
//!
//! These selectors are the de-facto wire protocol of this tool: the admin
//! UI promises this structure, and every interaction depends on it. When
//! the UI ships a new markup version, this module is what changes.

/// Table body of a custom-results listing page.
pub const LIST_TABLE_BODY: &str = "tbody.table-align-middle";

/// Name-bearing link inside a listing row.
pub const ROW_NAME_LINK: &str = "td[data-field='name'] a";

/// Name input on the detail/create form.
pub const NAME_INPUT: &str = "input#custom_result_name";

/// Container holding the term elements on a detail view.
pub const TERMS_CONTAINER: &str = "#js-terms-container.terms-container";

/// One term element; its class list encodes the match type.
pub const TERM_ITEM: &str = "div.search-term";

/// Dedicated label node inside a term element.
pub const TERM_LABEL: &str = "span.term__label";

/// Scrollable container of included products on a detail view.
pub const PRODUCTS_CONTAINER: &str = "#scrollable-included-results";

/// Label spans of included products.
pub const PRODUCT_LABEL: &str = ".result-items__text span";

/// Either detail container; presence means the detail view is rendered.
pub const DETAIL_READY: &str = "#js-terms-container, #scrollable-included-results";

/// "Add new custom result" trigger on the listing page.
pub const ADD_RESULT_BUTTON: &str = "#add_custom_result";

/// Match-type dropdown trigger on the create form.
pub const MATCH_DROPDOWN_BUTTON: &str = "#termDropdownMenuButton";

/// Any dropdown menu in its open state.
pub const OPEN_DROPDOWN_MENU: &str = "div.dropdown-menu.show";

/// Term entry field on the create form.
pub const TERM_INPUT: &str = "input#id_term_input.search-term-input";

/// "Add term" trigger on the create form.
pub const ADD_TERM_BUTTON: &str = "button[phx-click='add_term']";

/// Dropdown that opens the include-items chooser.
pub const INCLUDE_DROPDOWN_BUTTON: &str = "#included_results_box-dropdownMenuButton";

/// The include-items modal in its open state.
pub const INCLUDE_MODAL_OPEN: &str = "dialog#included-items-modal-modal[open]";

/// Search input inside the include-items modal.
pub const MODAL_SEARCH_INPUT: &str = "#included-items-modal-input";

/// Clickable label of the first matching item in the modal result list.
pub const MODAL_RESULT_LABEL: &str = "#included-items-modal-scroll.items-selection .item label";

/// Enabled confirmation button in the modal footer.
pub const MODAL_CONFIRM_BUTTON: &str =
    "dialog#included-items-modal-modal button.btn-success:not([disabled])";

/// Submit control of the create form.
pub const SUBMIT_BUTTON: &str = "#id_submit_button";

/// Fixed overlay header whose height click scrolling must compensate for.
pub const TOP_BAR: &str = "section.ui-top-bar";
