use clap::Parser;

/// Randomly selects members among the respondents of a sign-up form.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON file describing the draw. Paths in this file are relative
    /// to its location. Values passed on the command line take precedence.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// The number of spaces available, including the pre-approved people.
    #[clap(short, long, value_parser)]
    pub number_spaces: Option<u32>,

    /// If passed, draws among the respondents left over by the previous draw instead of
    /// reading the responses again.
    #[clap(short = 'r', long, takes_value = false)]
    pub draw_remaining: bool,

    /// (file path) The responses of the form, as an Excel or CSV export.
    #[clap(short, long, value_parser)]
    pub file_location: Option<String>,

    /// (comma-separated names) People who already have a space: "Alice Smith, Bob Jones".
    #[clap(short, long, value_parser)]
    pub preapproved: Option<String>,

    /// (msforms or csv) The type of the responses file. Guessed from the extension by default.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (file path, default membership.csv) The membership registry exported from the union.
    #[clap(short, long, value_parser)]
    pub membership: Option<String>,

    /// The header of the column holding the email addresses.
    #[clap(long, value_parser)]
    pub email_column: Option<String>,

    /// The header of the column holding the full names.
    #[clap(long, value_parser)]
    pub name_column: Option<String>,

    /// The headers of the eligibility questions. Can be repeated.
    #[clap(long, value_parser)]
    pub eligibility_columns: Option<Vec<String>>,

    /// (number starting at 1, or Excel column name) All the columns from this one onward
    /// are eligibility questions.
    #[clap(long, value_parser)]
    pub first_eligibility_column: Option<String>,

    /// When using an Excel file with several worksheets, indicates the name of the worksheet to use.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    /// (directory, default current directory) Where the selected and remaining files are written.
    #[clap(long, value_parser)]
    pub output_directory: Option<String>,

    /// (number) Makes the draw reproducible.
    #[clap(long, value_parser)]
    pub seed: Option<u64>,

    /// (file path or 'stdout') If specified, the summary of the draw will be written in JSON format
    /// to the given location.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A summary from a previous draw. If provided, the program checks that this
    /// draw produces the same summary, and writes nothing otherwise.
    #[clap(long, value_parser)]
    pub reference: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
