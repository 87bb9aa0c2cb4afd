//! Goals and tool specs shipped with the crate

use super::{ArgumentSpec, Goal, ToolSpec, GOAL_SELECTION_ID};

const STARTER_PROMPT: &str = "Welcome me, give me a description of what you can do, \
then ask me for the details you need to do your job.";

fn tool(name: &str, description: &str, arguments: &[(&str, &str, &str)]) -> ToolSpec {
    ToolSpec {
        name: name.to_string(),
        description: description.to_string(),
        arguments: arguments
            .iter()
            .map(|(n, t, d)| ArgumentSpec::new(*n, *t, *d))
            .collect(),
    }
}

fn transcript(lines: &[&str]) -> String {
    lines.join("\n ")
}

pub fn list_agents_tool() -> ToolSpec {
    tool(
        "ListAgents",
        "List available agents to interact with, pulled from the goal catalog.",
        &[],
    )
}

pub fn change_goal_tool() -> ToolSpec {
    tool(
        "ChangeGoal",
        "Change the goal of the active agent to the one the user picked.",
        &[("goalID", "string", "Id of the goal to switch to")],
    )
}

pub fn search_flights_tool() -> ToolSpec {
    tool(
        "SearchFlights",
        "Search for return flights from an origin to a destination within a date range.",
        &[
            ("origin", "string", "Airport or city (infer airport code from city)"),
            ("destination", "string", "Airport or city code for arrival"),
            ("dateFrom", "ISO8601", "Start of date range"),
            ("dateTo", "ISO8601", "End of date range"),
        ],
    )
}

pub fn create_invoice_tool() -> ToolSpec {
    tool(
        "CreateInvoice",
        "Generate an invoice for the items described for the total inferred from the conversation.",
        &[
            ("amount", "float", "Total cost to invoice"),
            ("tripDetails", "string", "Summary of the trip being invoiced"),
        ],
    )
}

pub fn find_events_tool() -> ToolSpec {
    tool(
        "FindEvents",
        "Find upcoming events to travel to in a given city and month.",
        &[
            ("city", "string", "City in Australia or New Zealand"),
            ("month", "string", "Month of the year, e.g. May"),
        ],
    )
}

pub fn search_fixtures_tool() -> ToolSpec {
    tool(
        "SearchFixtures",
        "Search for Premier League fixtures for a team within a date range.",
        &[
            ("team", "string", "Full name of the team"),
            ("date_from", "ISO8601", "Start of date range"),
            ("date_to", "ISO8601", "End of date range"),
        ],
    )
}

pub fn search_trains_tool() -> ToolSpec {
    tool(
        "SearchTrains",
        "Search for trains between two UK cities around the given times.",
        &[
            ("origin", "string", "Departure city"),
            ("destination", "string", "Arrival city"),
            ("outbound_time", "ISO8601", "Outbound departure time"),
            ("return_time", "ISO8601", "Return departure time"),
        ],
    )
}

pub fn book_trains_tool() -> ToolSpec {
    tool(
        "BookTrains",
        "Book the train journeys the user selected.",
        &[("train_ids", "string", "Comma separated journey ids")],
    )
}

pub fn current_pto_tool() -> ToolSpec {
    tool(
        "CurrentPTO",
        "Report how much PTO the user currently has.",
        &[("email", "string", "Email address of the employee")],
    )
}

pub fn future_pto_calc_tool() -> ToolSpec {
    tool(
        "FuturePTOCalc",
        "Report whether the user will have enough PTO for the requested dates.",
        &[
            ("email", "string", "Email address of the employee"),
            ("start_date", "ISO8601", "First day off"),
            ("end_date", "ISO8601", "Last day off"),
        ],
    )
}

pub fn book_pto_tool() -> ToolSpec {
    tool(
        "BookPTO",
        "Book PTO once the user has typed 'yes'.",
        &[
            ("email", "string", "Email address of the employee"),
            ("start_date", "ISO8601", "First day off"),
            ("end_date", "ISO8601", "Last day off"),
        ],
    )
}

pub fn check_account_valid_tool() -> ToolSpec {
    tool(
        "CheckAccountValid",
        "Check that the customer's email or account id identifies a known account.",
        &[
            ("email", "string", "Email address of the customer"),
            ("account_id", "string", "Account id of the customer"),
        ],
    )
}

/// The goals offered out of the box. Every agent goal ends with
/// `ListAgents` so the user can get back to picking an agent.
pub fn builtin_goals() -> Vec<Goal> {
    vec![
        Goal {
            id: GOAL_SELECTION_ID.to_string(),
            category_tag: "system".to_string(),
            agent_name: "Choose Agent".to_string(),
            agent_friendly_description: "Choose the type of agent to assist you today."
                .to_string(),
            tools: vec![list_agents_tool(), change_goal_tool()],
            description: "The user wants to choose which type of agent they will interact \
                with. Gather args for these tools, in order: 1. ListAgents 2. ChangeGoal. \
                After these tools are complete, change your goal to the one the user chose."
                .to_string(),
            starter_prompt: format!(
                "{STARTER_PROMPT} Begin by listing all details of all agents as provided by \
                 the output of the first tool included in this goal."
            ),
            example_conversation_history: transcript(&[
                "agent: Here are the currently available agents.",
                "user_confirmed_tool_run: <user clicks confirm on ListAgents tool>",
                "tool_result: { 'agent_name': 'Event Flight Finder', 'goal_id': 'goal_event_flight_invoice' }",
                "agent: The available agents are: 1. Event Flight Finder. Which agent would you like to speak to?",
                "user: 1",
                "user_confirmed_tool_run: <user clicks confirm on ChangeGoal tool>",
                "tool_result: { 'new_goal': 'goal_event_flight_invoice' }",
            ]),
        },
        Goal {
            id: "goal_event_flight_invoice".to_string(),
            category_tag: "travel".to_string(),
            agent_name: "Australia and New Zealand Event Flight Booking".to_string(),
            agent_friendly_description: "Book a trip to a city in Australia or New Zealand \
                around the dates of events in that city."
                .to_string(),
            tools: vec![
                find_events_tool(),
                search_flights_tool(),
                create_invoice_tool(),
                list_agents_tool(),
            ],
            description: "Help the user gather args for these tools in order: \
                1. FindEvents 2. SearchFlights 3. CreateInvoice"
                .to_string(),
            starter_prompt: STARTER_PROMPT.to_string(),
            example_conversation_history: transcript(&[
                "user: I'd like to travel to an event",
                "agent: Which city and month are you interested in?",
                "user: sydney in may please",
                "user_confirmed_tool_run: <user clicks confirm on FindEvents tool>",
                "tool_result: { 'event_name': 'Vivid Sydney', 'event_date': '2025-05-01' }",
                "agent: Found Vivid Sydney. Would you like to search for flights?",
                "user_confirmed_tool_run: <user clicks confirm on SearchFlights tool>",
                "tool_result: { 'flight_number': 'CX101', 'price': 850.0 }",
                "agent: The cheapest is CX101 for $850. Shall I invoice you?",
                "user_confirmed_tool_run: <user clicks confirm on CreateInvoice tool>",
            ]),
        },
        Goal {
            id: "goal_match_train_invoice".to_string(),
            category_tag: "travel".to_string(),
            agent_name: "UK Premier League Match Trip Booking".to_string(),
            agent_friendly_description: "Book a trip to a city in the UK around the dates \
                of a premier league match."
                .to_string(),
            tools: vec![
                search_fixtures_tool(),
                search_trains_tool(),
                book_trains_tool(),
                create_invoice_tool(),
                list_agents_tool(),
            ],
            description: "Help the user find a match, book trains to it from London and \
                invoice them. Gather args in order: 1. SearchFixtures 2. SearchTrains \
                3. BookTrains 4. CreateInvoice"
                .to_string(),
            starter_prompt: STARTER_PROMPT.to_string(),
            example_conversation_history: transcript(&[
                "user: I'd like to travel to a premier league match",
                "agent: Which team and what date range?",
                "user: Wolves between mid-April and the first week of May, please.",
                "user_confirmed_tool_run: <user clicks confirm on SearchFixtures tool>",
                "agent: Which match would you like to attend?",
            ]),
        },
        Goal {
            id: "goal_hr_schedule_pto".to_string(),
            category_tag: "hr".to_string(),
            agent_name: "Schedule PTO".to_string(),
            agent_friendly_description: "Schedule PTO based on your available PTO.".to_string(),
            tools: vec![
                current_pto_tool(),
                future_pto_calc_tool(),
                book_pto_tool(),
                list_agents_tool(),
            ],
            description: "The user wants to schedule paid time off after today's date. \
                Gather args for these tools in order: 1. CurrentPTO 2. FuturePTOCalc \
                3. BookPTO"
                .to_string(),
            starter_prompt: STARTER_PROMPT.to_string(),
            example_conversation_history: transcript(&[
                "user: I'd like to schedule some time off",
                "agent: May I have your email address?",
                "user: bob.johnson@emailzzz.com",
                "user_confirmed_tool_run: <user clicks confirm on CurrentPTO tool>",
                "tool_result: { 'num_hours': 400, 'num_days': 50 }",
                "agent: You have 50 days of PTO available. What dates would you like?",
            ]),
        },
        Goal {
            id: "goal_fin_check_account".to_string(),
            category_tag: "fin".to_string(),
            agent_name: "Account Lookup".to_string(),
            agent_friendly_description: "Check that your account is in good standing."
                .to_string(),
            tools: vec![check_account_valid_tool(), list_agents_tool()],
            description: "The user wants to verify their account. Gather args for: \
                1. CheckAccountValid"
                .to_string(),
            starter_prompt: STARTER_PROMPT.to_string(),
            example_conversation_history: transcript(&[
                "user: Is my account ok?",
                "agent: Please give me your email address or account id.",
                "user: matt.murdock@nelsonmurdock.com",
                "user_confirmed_tool_run: <user clicks confirm on CheckAccountValid tool>",
                "tool_result: { 'status': 'account valid' }",
            ]),
        },
    ]
}
