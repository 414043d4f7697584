pub mod formatter;

pub use formatter::{
    format_class_list, format_elapsed, format_judge_rows, format_roster, format_run_report,
    format_summary_table, format_tsv, should_use_colors,
};
